// Core infrastructure shared across the crate

pub mod errors;
pub mod config;
pub mod logging;
pub mod time;

// Re-export commonly used types
pub use errors::{ParamError, Result};
pub use config::{ClockConfig, ManagerConfig};
pub use time::{Instant, MissionClock, SimulationClock, WallClock};
