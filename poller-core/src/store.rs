//! Host entity store abstraction.
//!
//! The host owns entity state; the poller only writes specific keys through
//! this trait and never relies on reading them back.

use serde_json::{Map, Value};
use std::{collections::HashMap, sync::RwLock};
use thiserror::Error;

use crate::model::EntityId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entity '{0}' could not be created: {1}")]
    CreateFailed(EntityId, String),

    #[error("entity store lock poisoned")]
    Poisoned,
}

/// Key-value surface over host entities. No transactional guarantees.
pub trait EntityStore: Send + Sync {
    fn get(&self, entity: &EntityId, key: &str) -> Option<Value>;

    fn set(&self, entity: &EntityId, key: &str, value: Value);

    /// Materialise an entity so later `set` calls land somewhere.
    fn create_entity(&self, entity: &EntityId, label: &str) -> Result<(), StoreError>;
}

/// In-memory store, used by the CLI and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entities: RwLock<HashMap<EntityId, Map<String, Value>>>,
    labels: RwLock<HashMap<EntityId, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every key currently set on `entity`.
    pub fn snapshot(&self, entity: &EntityId) -> Map<String, Value> {
        self.entities
            .read()
            .ok()
            .and_then(|entities| entities.get(entity).cloned())
            .unwrap_or_default()
    }

    /// Ids of every entity that has been created or written to.
    pub fn entity_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .entities
            .read()
            .map(|entities| entities.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    pub fn label(&self, entity: &EntityId) -> Option<String> {
        self.labels.read().ok()?.get(entity).cloned()
    }
}

impl EntityStore for MemoryStore {
    fn get(&self, entity: &EntityId, key: &str) -> Option<Value> {
        self.entities.read().ok()?.get(entity)?.get(key).cloned()
    }

    fn set(&self, entity: &EntityId, key: &str, value: Value) {
        if let Ok(mut entities) = self.entities.write() {
            entities
                .entry(entity.clone())
                .or_default()
                .insert(key.to_string(), value);
        }
    }

    fn create_entity(&self, entity: &EntityId, label: &str) -> Result<(), StoreError> {
        self.entities
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .entry(entity.clone())
            .or_default();
        self.labels
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(entity.clone(), label.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_then_get() {
        let store = MemoryStore::new();
        let id = EntityId::from("weather");

        assert_eq!(store.get(&id, "Pressure"), None);
        store.set(&id, "Pressure", json!("1013"));
        assert_eq!(store.get(&id, "Pressure"), Some(json!("1013")));
    }

    #[test]
    fn create_entity_registers_empty_entity() {
        let store = MemoryStore::new();
        let id = EntityId::from("weather-humidity");

        store.create_entity(&id, "Weather Humidity").unwrap();

        assert_eq!(store.entity_ids(), vec![id.clone()]);
        assert!(store.snapshot(&id).is_empty());
        assert_eq!(store.label(&id).as_deref(), Some("Weather Humidity"));
    }

    #[test]
    fn create_entity_keeps_existing_values() {
        let store = MemoryStore::new();
        let id = EntityId::from("weather");
        store.set(&id, "LocationName", json!("Exeter"));

        store.create_entity(&id, "Weather").unwrap();

        assert_eq!(store.get(&id, "LocationName"), Some(json!("Exeter")));
    }
}
