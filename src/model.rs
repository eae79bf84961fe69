//! Models bind one schema to one storage adapter; the registry maps wire kinds to models.

use crate::entity::Entity;
use crate::error::{ApiError, ConfigError, ValidationError};
use crate::query::Query;
use crate::schema::EntitySchema;
use crate::store::{Key, StorageAdapter};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub struct Model {
    schema: EntitySchema,
    adapter: Arc<dyn StorageAdapter>,
}

impl Model {
    /// The adapter must serve the schema's kind.
    pub fn new(schema: EntitySchema, adapter: Arc<dyn StorageAdapter>) -> Result<Self, ConfigError> {
        if adapter.entity_name() != schema.kind() {
            return Err(ConfigError::AdapterMismatch {
                kind: schema.kind().to_string(),
                adapter: adapter.entity_name().to_string(),
            });
        }
        Ok(Model { schema, adapter })
    }

    pub fn kind(&self) -> &str {
        self.schema.kind()
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn adapter(&self) -> &dyn StorageAdapter {
        self.adapter.as_ref()
    }

    /// New, unsaved entity from keyword values.
    pub fn create(self: &Arc<Self>, values: Map<String, Value>) -> Result<Entity, ValidationError> {
        Entity::new(self, values)
    }

    pub fn decode(self: &Arc<Self>, raw: Value) -> Result<Entity, ApiError> {
        Entity::decode(self, raw)
    }

    pub async fn get_by_key(self: &Arc<Self>, key: Key) -> Result<Option<Entity>, ApiError> {
        Entity::fetch_by_key(self, key).await
    }

    pub fn query(self: &Arc<Self>) -> Query {
        Query::new(Arc::clone(self))
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("schema", &self.schema)
            .field("adapter", &self.adapter.entity_name())
            .finish()
    }
}

/// Kind -> model table, fixed at startup and shared read-only.
#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    models: Vec<Arc<Model>>,
    by_kind: HashMap<String, Arc<Model>>,
}

impl ModelRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn model(&self, kind: &str) -> Option<&Arc<Model>> {
        self.by_kind.get(kind)
    }

    /// Models in registration order.
    pub fn models(&self) -> &[Arc<Model>] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    models: Vec<Model>,
}

impl RegistryBuilder {
    pub fn register(mut self, model: Model) -> Self {
        self.models.push(model);
        self
    }

    pub fn build(self) -> Result<ModelRegistry, ConfigError> {
        let mut registry = ModelRegistry::default();
        for model in self.models {
            let model = Arc::new(model);
            if registry
                .by_kind
                .insert(model.kind().to_string(), Arc::clone(&model))
                .is_some()
            {
                return Err(ConfigError::DuplicateKind(model.kind().to_string()));
            }
            registry.models.push(model);
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Property;
    use crate::store::MemoryBackend;

    fn schema(kind: &str) -> EntitySchema {
        EntitySchema::builder(kind)
            .property("name", Property::string())
            .build()
            .unwrap()
    }

    #[test]
    fn adapter_must_match_kind() {
        let backend = Arc::new(MemoryBackend::new());
        let err = Model::new(schema("person"), Arc::new(backend.adapter("pet"))).unwrap_err();
        assert!(matches!(err, ConfigError::AdapterMismatch { .. }));
    }

    #[test]
    fn registry_rejects_duplicate_kinds() {
        let backend = Arc::new(MemoryBackend::new());
        let model = |kind: &str| Model::new(schema(kind), Arc::new(backend.adapter(kind))).unwrap();
        let registry = ModelRegistry::builder()
            .register(model("person"))
            .register(model("pet"))
            .build()
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.models()[1].kind(), "pet");
        assert!(registry.model("person").is_some());
        assert!(registry.model("robot").is_none());

        let err = ModelRegistry::builder()
            .register(model("person"))
            .register(model("person"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateKind(k) if k == "person"));
    }
}
