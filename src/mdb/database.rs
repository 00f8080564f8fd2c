use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::core::errors::{ParamError, Result};
use crate::mdb::types::ParameterDefinition;

/// Enumerable view of every parameter known to the processor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MissionDatabase {
    #[serde(default)]
    parameters: Vec<Arc<ParameterDefinition>>,
}

impl MissionDatabase {
    pub fn new(parameters: Vec<ParameterDefinition>) -> Self {
        Self {
            parameters: parameters.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mdb: Self = serde_yaml::from_str(yaml)?;
        Ok(mdb)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ParamError::io(format!("read {}", path.display()), e))?;
        let mdb = Self::from_yaml_str(&content)?;
        info!(
            path = %path.display(),
            parameters = mdb.parameters.len(),
            "Loaded mission database"
        );
        Ok(mdb)
    }

    pub fn add(&mut self, definition: ParameterDefinition) -> Arc<ParameterDefinition> {
        let definition = Arc::new(definition);
        self.parameters.push(definition.clone());
        definition
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Arc<ParameterDefinition>> {
        self.parameters.iter()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}
