use dashmap::DashMap;
use tracing::trace;

use crate::local::distribution::ParameterListener;
use crate::mdb::types::ParameterDefinition;
use crate::value::parameter_value::ParameterValue;

/// Most recent full value per parameter, owned by the processing engine.
///
/// The local parameter manager only reads from it when merging partial updates.
pub trait LastValueCache: Send + Sync {
    fn get(&self, definition: &ParameterDefinition) -> Option<ParameterValue>;
}

/// Concurrent in-memory cache keyed by qualified name.
///
/// Registered as a listener, it commits every distributed batch.
#[derive(Debug, Default)]
pub struct InMemoryLastValueCache {
    values: DashMap<String, ParameterValue>,
}

impl InMemoryLastValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, value: ParameterValue) {
        self.values.insert(value.qualified_name().to_string(), value);
    }

    pub fn get_by_name(&self, qualified_name: &str) -> Option<ParameterValue> {
        self.values.get(qualified_name).map(|v| v.value().clone())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&self) {
        self.values.clear();
    }
}

impl LastValueCache for InMemoryLastValueCache {
    fn get(&self, definition: &ParameterDefinition) -> Option<ParameterValue> {
        self.get_by_name(&definition.qualified_name)
    }
}

impl ParameterListener for InMemoryLastValueCache {
    fn name(&self) -> &str {
        "last-value-cache"
    }

    fn update(&self, values: &[ParameterValue]) -> anyhow::Result<()> {
        for value in values {
            // Partial values never reach listeners, they are merged upstream
            if value.is_partial() {
                anyhow::bail!(
                    "refusing to cache partial value for {}",
                    value.qualified_name()
                );
            }
            trace!(parameter = value.qualified_name(), "Caching value");
            self.put(value.clone());
        }
        Ok(())
    }
}
