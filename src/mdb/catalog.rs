//! Index of the locally-sourced parameters
//!
//! Built once from the mission database and read-only afterwards, so lookups
//! need no locking and the catalog can be shared freely between callers.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::errors::{ParamError, Result};
use crate::mdb::database::MissionDatabase;
use crate::mdb::types::{NamedObjectId, ParameterDefinition};

#[derive(Debug, Default)]
pub struct ParameterCatalog {
    /// Registration order, used by subscribe-all
    definitions: Vec<Arc<ParameterDefinition>>,
    by_qualified_name: HashMap<String, Arc<ParameterDefinition>>,
    by_namespace: HashMap<String, HashMap<String, Arc<ParameterDefinition>>>,
}

impl ParameterCatalog {
    /// Keep and index only the definitions tagged LOCAL
    pub fn initialize<'a, I>(all_definitions: I) -> Self
    where
        I: IntoIterator<Item = &'a Arc<ParameterDefinition>>,
    {
        let mut catalog = Self::default();
        let mut skipped = 0usize;
        for definition in all_definitions {
            if definition.is_local() {
                catalog.add(definition.clone());
            } else {
                skipped += 1;
            }
        }
        info!(
            local = catalog.len(),
            skipped = skipped,
            "Found {} local parameters",
            catalog.len()
        );
        catalog
    }

    pub fn from_database(mdb: &MissionDatabase) -> Self {
        Self::initialize(mdb.parameters())
    }

    fn add(&mut self, definition: Arc<ParameterDefinition>) {
        if self
            .by_qualified_name
            .contains_key(&definition.qualified_name)
        {
            debug!(parameter = %definition.qualified_name, "Duplicate definition ignored");
            return;
        }
        self.by_qualified_name
            .insert(definition.qualified_name.clone(), definition.clone());

        if let Some(space_system) = definition.space_system() {
            self.by_namespace
                .entry(space_system.to_string())
                .or_default()
                .insert(definition.name().to_string(), definition.clone());
        }
        for alias in &definition.aliases {
            self.by_namespace
                .entry(alias.namespace.clone())
                .or_default()
                .insert(alias.name.clone(), definition.clone());
        }
        self.definitions.push(definition);
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<&Arc<ParameterDefinition>> {
        self.by_qualified_name.get(name)
    }

    pub fn lookup_by_namespaced_id(
        &self,
        namespace: Option<&str>,
        name: &str,
    ) -> Option<&Arc<ParameterDefinition>> {
        match namespace {
            Some(ns) => self.by_namespace.get(ns).and_then(|names| names.get(name)),
            None => self.lookup_by_name(name),
        }
    }

    pub fn lookup(&self, id: &NamedObjectId) -> Option<&Arc<ParameterDefinition>> {
        self.lookup_by_namespaced_id(id.namespace.as_deref(), &id.name)
    }

    pub fn resolve(&self, id: &NamedObjectId) -> Result<Arc<ParameterDefinition>> {
        self.lookup(id).cloned().ok_or_else(|| {
            info!(id = %id, "Cannot provide parameter, not a local parameter");
            ParamError::unknown_parameter(id)
        })
    }

    /// Membership by qualified name; the catalog's own instance is authoritative
    pub fn can_provide(&self, definition: &ParameterDefinition) -> bool {
        self.by_qualified_name
            .contains_key(&definition.qualified_name)
    }

    /// The registered instance for an equivalent definition
    pub fn canonical(&self, definition: &ParameterDefinition) -> Option<&Arc<ParameterDefinition>> {
        self.by_qualified_name.get(&definition.qualified_name)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Arc<ParameterDefinition>> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mdb::types::{DataSource, ParameterType};

    fn catalog() -> ParameterCatalog {
        let mdb = MissionDatabase::new(vec![
            ParameterDefinition::local(
                "/YSS/SIMULATOR/Mode",
                ParameterType::Integer {
                    signed: true,
                    size_in_bits: 32,
                },
            )
            .with_alias("MDB:OPS Name", "SIM_MODE"),
            ParameterDefinition::new("/YSS/SIMULATOR/Voltage", DataSource::Telemetered),
        ]);
        ParameterCatalog::from_database(&mdb)
    }

    #[test]
    fn test_only_local_parameters_are_indexed() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.lookup_by_name("/YSS/SIMULATOR/Mode").is_some());
        assert!(catalog.lookup_by_name("/YSS/SIMULATOR/Voltage").is_none());
    }

    #[test]
    fn test_namespaced_lookup() {
        let catalog = catalog();
        let by_alias = catalog.lookup_by_namespaced_id(Some("MDB:OPS Name"), "SIM_MODE");
        let by_ss = catalog.lookup_by_namespaced_id(Some("/YSS/SIMULATOR"), "Mode");
        let by_qn = catalog.lookup_by_namespaced_id(None, "/YSS/SIMULATOR/Mode");
        assert!(by_alias.is_some());
        assert!(Arc::ptr_eq(by_alias.unwrap(), by_ss.unwrap()));
        assert!(Arc::ptr_eq(by_ss.unwrap(), by_qn.unwrap()));
        assert!(catalog
            .lookup_by_namespaced_id(Some("MDB:OPS Name"), "Mode")
            .is_none());
    }

    #[test]
    fn test_resolve_unknown() {
        let catalog = catalog();
        let err = catalog
            .resolve(&NamedObjectId::qualified("/YSS/SIMULATOR/Voltage"))
            .unwrap_err();
        assert!(matches!(err, ParamError::UnknownParameter { .. }));
    }

    #[test]
    fn test_can_provide_uses_qualified_name() {
        let catalog = catalog();
        // An equivalent standalone instance, not the registered one
        let standalone = ParameterDefinition::new("/YSS/SIMULATOR/Mode", DataSource::Local);
        assert!(catalog.can_provide(&standalone));
        let other = ParameterDefinition::new("/YSS/SIMULATOR/Other", DataSource::Local);
        assert!(!catalog.can_provide(&other));
    }
}
