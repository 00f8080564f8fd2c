use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::mdb::types::ParameterDefinition;

/// Parameters currently active for distribution.
///
/// Owned by the ordering lane; never touched from any other task.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    active: HashMap<String, Arc<ParameterDefinition>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, definition: Arc<ParameterDefinition>) {
        debug!(parameter = %definition.qualified_name, "Providing parameter");
        self.active
            .insert(definition.qualified_name.clone(), definition);
    }

    pub fn subscribe_all<'a, I>(&mut self, definitions: I)
    where
        I: IntoIterator<Item = &'a Arc<ParameterDefinition>>,
    {
        for definition in definitions {
            self.active
                .insert(definition.qualified_name.clone(), definition.clone());
        }
        debug!(active = self.active.len(), "Providing all local parameters");
    }

    pub fn unsubscribe(&mut self, definition: &ParameterDefinition) {
        if self.active.remove(&definition.qualified_name).is_some() {
            debug!(parameter = %definition.qualified_name, "Stopped providing parameter");
        }
    }

    pub fn is_active(&self, definition: &ParameterDefinition) -> bool {
        self.active.contains_key(&definition.qualified_name)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mdb::types::ParameterType;

    fn def(name: &str) -> Arc<ParameterDefinition> {
        Arc::new(ParameterDefinition::local(name, ParameterType::Boolean))
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let mut registry = SubscriptionRegistry::new();
        let p = def("/p/P");
        registry.subscribe(p.clone());
        registry.subscribe(p.clone());
        assert!(registry.is_active(&p));
        registry.unsubscribe(&p);
        assert!(!registry.is_active(&p));
        // Removing again is fine
        registry.unsubscribe(&p);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_subscribe_all() {
        let mut registry = SubscriptionRegistry::new();
        let all = vec![def("/p/A"), def("/p/B")];
        registry.subscribe_all(&all);
        assert_eq!(registry.len(), 2);
        assert!(registry.is_active(&ParameterDefinition::local("/p/B", ParameterType::Boolean)));
    }
}
