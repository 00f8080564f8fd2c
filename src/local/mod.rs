//! Local parameter injection and distribution

pub mod subscription;
pub mod distribution;
pub mod lane;
pub mod manager;
pub mod builder;

pub use subscription::SubscriptionRegistry;
pub use distribution::{
    BufferingListener, ChannelParameterSink, ListenerDistribution, LoggingListener,
    ParameterListener, ParameterSink,
};
pub use lane::{LaneRequest, OrderingWorker};
pub use manager::{
    LocalParameterManager, ParameterProvider, RejectedValue, SoftwareParameterManager,
    UpdateReport,
};
pub use builder::LocalParameterManagerBuilder;
