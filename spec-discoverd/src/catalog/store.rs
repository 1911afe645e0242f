use std::collections::HashMap;
use shared::types::{Deployment, Keyed, Service};

/// Entities keyed by identity. At most one entity lives under any key;
/// a later insert replaces the earlier one without versioning.
#[derive(Debug, Clone)]
pub struct EntityMap<T> {
    entries: HashMap<String, T>,
}

pub type ServiceMap = EntityMap<Service>;
pub type DeploymentMap = EntityMap<Deployment>;

impl<T> Default for EntityMap<T> {
    fn default() -> Self {
        Self { entries: HashMap::new() }
    }
}

impl<T: Keyed + Clone + PartialEq> EntityMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Returns true if the stored data changed.
    pub fn insert(&mut self, entity: T) -> bool {
        let key = entity.key();
        match self.entries.get(&key) {
            Some(existing) if *existing == entity => false,
            _ => {
                self.entries.insert(key, entity);
                true
            }
        }
    }

    /// Remove by identity. Returns true if something was removed.
    pub fn delete(&mut self, entity: &T) -> bool {
        self.entries.remove(&entity.key()).is_some()
    }

    /// Point-in-time copy of every entity, in no particular order.
    pub fn list(&self) -> Vec<T> {
        self.entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
