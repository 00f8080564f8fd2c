use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::core::errors::{ParamError, Result};
use crate::core::time::{Instant, MissionClock, SimulationClock, WallClock};

/// Where the manager reads mission time from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClockConfig {
    #[default]
    Wallclock,
    Simulation {
        /// RFC 3339 start time, defaults to the current wall time
        #[serde(default)]
        start: Option<String>,
    },
}

impl ClockConfig {
    pub fn build(&self) -> Result<Arc<dyn MissionClock>> {
        match self {
            ClockConfig::Wallclock => Ok(Arc::new(WallClock)),
            ClockConfig::Simulation { start } => {
                let start = match start {
                    Some(s) => Instant::parse_rfc3339(s)?,
                    None => WallClock.now(),
                };
                Ok(Arc::new(SimulationClock::new(start)))
            }
        }
    }
}

/// Local parameter manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Instance name attached to log records
    pub instance: String,
    /// Forward distributed batches to the recording sink
    pub record_local_values: bool,
    /// Activate every local parameter when the lane starts
    pub subscribe_all_on_start: bool,
    /// Mission clock source
    pub clock: ClockConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            instance: "default".to_string(),
            record_local_values: false,
            subscribe_all_on_start: false,
            clock: ClockConfig::default(),
        }
    }
}

impl ManagerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.instance.trim().is_empty() {
            return Err(ParamError::configuration_field(
                "instance cannot be empty",
                "instance",
            ));
        }
        if let ClockConfig::Simulation { start: Some(start) } = &self.clock {
            Instant::parse_rfc3339(start).map_err(|_| {
                ParamError::configuration_field(
                    format!("simulation start '{}' is not RFC 3339", start),
                    "clock.start",
                )
            })?;
        }
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ParamError::io(format!("read {}", path.as_ref().display()), e))?;
        Self::from_yaml_str(&content)
    }
}
