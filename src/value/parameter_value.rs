use serde::Serialize;
use std::sync::Arc;

use crate::core::time::Instant;
use crate::mdb::types::ParameterDefinition;
use crate::value::path::MemberPath;
use crate::value::value::Value;

/// Snapshot of a parameter value travelling through the processor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterValue {
    definition: Arc<ParameterDefinition>,
    pub raw_value: Option<Value>,
    pub eng_value: Value,
    pub generation_time: Option<Instant>,
    pub acquisition_time: Option<Instant>,
    /// Set when the update addresses one member or element of a composite value
    pub partial: Option<MemberPath>,
}

impl ParameterValue {
    pub fn new(definition: Arc<ParameterDefinition>, eng_value: Value) -> Self {
        Self {
            definition,
            raw_value: None,
            eng_value,
            generation_time: None,
            acquisition_time: None,
            partial: None,
        }
    }

    /// Update addressing only `path` inside the parameter's composite value
    pub fn partial(definition: Arc<ParameterDefinition>, path: MemberPath, value: Value) -> Self {
        Self {
            partial: Some(path),
            ..Self::new(definition, value)
        }
    }

    pub fn with_raw_value(mut self, raw: Value) -> Self {
        self.raw_value = Some(raw);
        self
    }

    pub fn with_times(mut self, generation: Instant, acquisition: Instant) -> Self {
        self.generation_time = Some(generation);
        self.acquisition_time = Some(acquisition);
        self
    }

    pub fn definition(&self) -> &Arc<ParameterDefinition> {
        &self.definition
    }

    pub fn qualified_name(&self) -> &str {
        &self.definition.qualified_name
    }

    pub fn is_partial(&self) -> bool {
        self.partial.is_some()
    }

    /// Fill unset timestamps from one clock sample
    pub fn stamp_if_unset(&mut self, now: Instant) {
        if self.generation_time.is_none() {
            self.generation_time = Some(now);
        }
        if self.acquisition_time.is_none() {
            self.acquisition_time = Some(now);
        }
    }

    /// Overwrite both timestamps
    pub fn stamp(&mut self, now: Instant) {
        self.generation_time = Some(now);
        self.acquisition_time = Some(now);
    }

    pub(crate) fn rebind(&mut self, definition: Arc<ParameterDefinition>) {
        self.definition = definition;
    }
}
