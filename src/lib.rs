// Core infrastructure: errors, configuration, time, logging
pub mod core;

// Parameter definitions and their lookup
pub mod mdb;

// Engineering values, coercion and the last-value cache
pub mod value;

// Local parameter manager and its ordering lane
pub mod local;

// Telemetry link intake
pub mod link;

pub use crate::core::errors::{ParamError, Result};
pub use crate::core::config::{ClockConfig, ManagerConfig};
pub use crate::core::time::{Instant, MissionClock, SimulationClock, WallClock};
pub use mdb::{
    DataSource, MissionDatabase, NamedObjectId, ParameterCatalog, ParameterDefinition,
    ParameterType,
};
pub use value::{
    AggregateValue, InMemoryLastValueCache, LastValueCache, MemberPath, ParameterValue, Value,
};
pub use local::{
    LocalParameterManager, LocalParameterManagerBuilder, ParameterListener, ParameterProvider,
    ParameterSink, SoftwareParameterManager, UpdateReport,
};
pub use link::{TmLink, TmPacket, TmPacketSink};
