use std::sync::Arc;
use tracing::{debug, info};

use crate::core::config::ManagerConfig;
use crate::core::errors::Result;
use crate::core::time::MissionClock;
use crate::local::distribution::{ListenerDistribution, ParameterListener, ParameterSink};
use crate::local::lane::{LaneRequest, OrderingWorker};
use crate::local::manager::LocalParameterManager;
use crate::mdb::catalog::ParameterCatalog;
use crate::mdb::database::MissionDatabase;
use crate::value::cache::{InMemoryLastValueCache, LastValueCache};
use crate::value::coerce::ValueCoercionEngine;

/// Fluent builder for [`LocalParameterManager`]
#[derive(Default)]
pub struct LocalParameterManagerBuilder {
    config: ManagerConfig,
    database: Option<MissionDatabase>,
    last_value_cache: Option<Arc<dyn LastValueCache>>,
    clock: Option<Arc<dyn MissionClock>>,
    recording_sink: Option<Arc<dyn ParameterSink>>,
    listeners: Vec<Arc<dyn ParameterListener>>,
}

impl LocalParameterManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn database(mut self, database: MissionDatabase) -> Self {
        self.database = Some(database);
        self
    }

    /// Cache owned by the engine. Without one, an in-memory cache is created
    /// and registered as the first listener.
    pub fn last_value_cache(mut self, cache: Arc<dyn LastValueCache>) -> Self {
        self.last_value_cache = Some(cache);
        self
    }

    /// Overrides the clock described by the configuration
    pub fn clock(mut self, clock: Arc<dyn MissionClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Only used when `record_local_values` is enabled
    pub fn recording_sink(mut self, sink: Arc<dyn ParameterSink>) -> Self {
        self.recording_sink = Some(sink);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn ParameterListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Index the local parameters and start the ordering lane.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<LocalParameterManager> {
        let config = self.config;
        config.validate()?;

        let clock = match self.clock {
            Some(clock) => clock,
            None => config.clock.build()?,
        };
        let catalog = Arc::new(ParameterCatalog::from_database(
            &self.database.unwrap_or_default(),
        ));

        let sink = if config.record_local_values {
            self.recording_sink
        } else {
            if self.recording_sink.is_some() {
                debug!("record_local_values is off, ignoring recording sink");
            }
            None
        };
        let mut distribution = ListenerDistribution::new(sink);

        let last_value_cache: Arc<dyn LastValueCache> = match self.last_value_cache {
            Some(cache) => cache,
            None => {
                let cache = Arc::new(InMemoryLastValueCache::new());
                distribution.register(cache.clone());
                cache
            }
        };
        for listener in self.listeners {
            distribution.register(listener);
        }

        let lane = OrderingWorker::spawn(
            config.instance.clone(),
            catalog.clone(),
            clock,
            distribution,
        )?;
        if config.subscribe_all_on_start {
            lane.submit(LaneRequest::SubscribeAll)?;
        }

        info!(
            instance = %config.instance,
            local_parameters = catalog.len(),
            recording = config.record_local_values,
            "Local parameter manager started"
        );
        Ok(LocalParameterManager::new(
            config,
            catalog,
            ValueCoercionEngine::new(last_value_cache),
            lane,
        ))
    }
}
