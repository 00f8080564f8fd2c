//! Local parameters: values set by operators and clients rather than telemetry
//!
//! Coercion and validation run on the caller's thread; everything that touches
//! shared state is submitted to the ordering lane, which sends the values out.

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::core::config::ManagerConfig;
use crate::core::errors::{ParamError, Result};
use crate::local::distribution::ParameterListener;
use crate::local::lane::{LaneRequest, OrderingWorker};
use crate::mdb::catalog::ParameterCatalog;
use crate::mdb::types::{NamedObjectId, ParameterDefinition};
use crate::value::coerce::ValueCoercionEngine;
use crate::value::parameter_value::ParameterValue;
use crate::value::value::Value;

/// Side facing the request router: which parameters are wanted downstream
pub trait ParameterProvider: Send + Sync {
    fn provide_all(&self) -> Result<()>;

    fn provide(&self, definition: &ParameterDefinition) -> Result<()>;

    fn stop_providing(&self, definition: &ParameterDefinition) -> Result<()>;

    fn can_provide(&self, id: &NamedObjectId) -> bool;

    fn can_provide_definition(&self, definition: &ParameterDefinition) -> bool;

    fn resolve(&self, id: &NamedObjectId) -> Result<Arc<ParameterDefinition>>;
}

/// Side facing client services: setting values
pub trait SoftwareParameterManager: Send + Sync {
    /// Coerce each value and submit the valid ones as one batch
    fn update_batch(&self, values: Vec<ParameterValue>) -> Result<UpdateReport>;

    /// Set a single engineering value, bypassing the subscription filter
    fn assign(&self, definition: &ParameterDefinition, eng_value: Value) -> Result<()>;
}

/// Batch item that failed validation and was not submitted
#[derive(Debug)]
pub struct RejectedValue {
    pub parameter: String,
    pub error: ParamError,
}

/// Outcome of a batch update, known before anything is distributed
#[derive(Debug, Default)]
pub struct UpdateReport {
    pub submitted: usize,
    pub rejected: Vec<RejectedValue>,
}

impl UpdateReport {
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

pub struct LocalParameterManager {
    config: ManagerConfig,
    catalog: Arc<ParameterCatalog>,
    coercion: ValueCoercionEngine,
    lane: OrderingWorker,
}

impl LocalParameterManager {
    pub(crate) fn new(
        config: ManagerConfig,
        catalog: Arc<ParameterCatalog>,
        coercion: ValueCoercionEngine,
        lane: OrderingWorker,
    ) -> Self {
        Self {
            config,
            catalog,
            coercion,
            lane,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<ParameterCatalog> {
        &self.catalog
    }

    pub fn local_parameters(&self) -> impl Iterator<Item = &Arc<ParameterDefinition>> {
        self.catalog.definitions()
    }

    /// Register a consumer; takes effect in order with pending updates
    pub fn add_listener(&self, listener: Arc<dyn ParameterListener>) -> Result<()> {
        self.lane.submit(LaneRequest::AddListener(listener))
    }

    /// Resolves once every request made before it has been distributed
    pub async fn sync(&self) -> Result<()> {
        self.lane.sync().await
    }

    /// Drain queued requests, then stop. Further calls fail with `LaneClosed`.
    pub async fn stop(&self) {
        self.lane.shutdown().await;
        debug!(instance = %self.config.instance, "Local parameter manager stopped");
    }

    pub fn update_parameters(&self, values: Vec<ParameterValue>) -> Result<UpdateReport> {
        self.update_batch(values)
    }

    pub fn update_parameter(&self, definition: &ParameterDefinition, value: Value) -> Result<()> {
        self.assign(definition, value)
    }

    pub fn is_stopped(&self) -> bool {
        self.lane.is_closed()
    }

    /// Replace the caller's definition with the catalog's instance when known
    fn bind(&self, mut value: ParameterValue) -> ParameterValue {
        if let Some(canonical) = self.catalog.canonical(value.definition()) {
            if !Arc::ptr_eq(canonical, value.definition()) {
                value.rebind(canonical.clone());
            }
        }
        value
    }
}

impl ParameterProvider for LocalParameterManager {
    fn provide_all(&self) -> Result<()> {
        debug!("requested to provide all");
        self.lane.submit(LaneRequest::SubscribeAll)
    }

    fn provide(&self, definition: &ParameterDefinition) -> Result<()> {
        debug!(parameter = %definition.qualified_name, "requested to provide");
        let canonical = self
            .catalog
            .canonical(definition)
            .ok_or_else(|| ParamError::unknown_parameter(&definition.qualified_name))?;
        self.lane.submit(LaneRequest::Subscribe(canonical.clone()))
    }

    fn stop_providing(&self, definition: &ParameterDefinition) -> Result<()> {
        debug!(parameter = %definition.qualified_name, "requested to stop providing");
        match self.catalog.canonical(definition) {
            Some(canonical) => self.lane.submit(LaneRequest::Unsubscribe(canonical.clone())),
            // Never active, nothing to remove
            None => Ok(()),
        }
    }

    fn can_provide(&self, id: &NamedObjectId) -> bool {
        self.catalog.lookup(id).is_some()
    }

    fn can_provide_definition(&self, definition: &ParameterDefinition) -> bool {
        self.catalog.can_provide(definition)
    }

    fn resolve(&self, id: &NamedObjectId) -> Result<Arc<ParameterDefinition>> {
        self.catalog.resolve(id)
    }
}

impl SoftwareParameterManager for LocalParameterManager {
    #[instrument(skip(self, values), fields(instance = %self.config.instance, count = values.len()))]
    fn update_batch(&self, values: Vec<ParameterValue>) -> Result<UpdateReport> {
        let mut accepted = Vec::with_capacity(values.len());
        let mut rejected = Vec::new();

        for value in values {
            let value = self.bind(value);
            match self.coercion.transform(&value) {
                Ok(transformed) => accepted.push(transformed),
                Err(error) => {
                    warn!(
                        parameter = value.qualified_name(),
                        category = error.category(),
                        "Rejected parameter value: {}",
                        error
                    );
                    rejected.push(RejectedValue {
                        parameter: value.qualified_name().to_string(),
                        error,
                    });
                }
            }
        }

        let submitted = accepted.len();
        if !accepted.is_empty() {
            self.lane.submit(LaneRequest::Update(accepted))?;
        }
        Ok(UpdateReport {
            submitted,
            rejected,
        })
    }

    #[instrument(skip(self, definition, eng_value), fields(instance = %self.config.instance, parameter = %definition.qualified_name))]
    fn assign(&self, definition: &ParameterDefinition, eng_value: Value) -> Result<()> {
        let eng_value = self.coercion.check_assignment(definition, &eng_value)?;
        let canonical = self
            .catalog
            .canonical(definition)
            .cloned()
            .unwrap_or_else(|| Arc::new(definition.clone()));
        self.lane
            .submit(LaneRequest::Assign(ParameterValue::new(canonical, eng_value)))
    }
}
