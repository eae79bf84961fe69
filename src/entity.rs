//! Entity instances: schema-bound records with a New -> Saved -> Deleted lifecycle.

use crate::error::{ApiError, ValidationError};
use crate::model::Model;
use crate::store::{Key, Record};
use serde_json::{Map, Value};
use std::sync::Arc;

static NULL: Value = Value::Null;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityState {
    /// Never persisted; no key.
    New,
    Saved,
    /// Terminal.
    Deleted,
}

#[derive(Clone, Debug)]
pub struct Entity {
    model: Arc<Model>,
    record: Record,
    state: EntityState,
}

impl Entity {
    /// Validate every declared property (absent = null) and reject unknown names.
    pub fn new(model: &Arc<Model>, values: Map<String, Value>) -> Result<Self, ValidationError> {
        let fields = model.schema().validate_all(values)?;
        Ok(Self::unsaved(model, fields))
    }

    /// Decode a wire object (`_type`/`_key` are ignored).
    pub fn decode(model: &Arc<Model>, raw: Value) -> Result<Self, ApiError> {
        let fields = model.schema().decode(raw)?;
        Ok(Self::unsaved(model, fields))
    }

    fn unsaved(model: &Arc<Model>, fields: Map<String, Value>) -> Self {
        let mut record = model.adapter().new_record();
        for (name, value) in fields {
            record.set(name, value);
        }
        Entity {
            model: Arc::clone(model),
            record,
            state: EntityState::New,
        }
    }

    /// Wrap a record read back from the adapter. Backend data is not re-validated.
    pub fn from_record(model: &Arc<Model>, record: Record) -> Self {
        let state = if record.key().is_some() {
            EntityState::Saved
        } else {
            EntityState::New
        };
        Entity {
            model: Arc::clone(model),
            record,
            state,
        }
    }

    /// `None` when the adapter has no record for `key`.
    pub async fn fetch_by_key(model: &Arc<Model>, key: Key) -> Result<Option<Self>, ApiError> {
        let record = model.adapter().fetch_by_primary_key(key).await?;
        Ok(record.map(|r| Self::from_record(model, r)))
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn kind(&self) -> &str {
        self.model.kind()
    }

    pub fn key(&self) -> Option<Key> {
        self.record.key()
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    pub fn is_saved(&self) -> bool {
        self.state == EntityState::Saved
    }

    /// Value of a declared property; unset properties read as null.
    pub fn get(&self, name: &str) -> Option<&Value> {
        if !self.model.schema().contains(name) {
            return None;
        }
        Some(self.record.get(name).unwrap_or(&NULL))
    }

    pub fn set(&mut self, name: &str, value: Value) -> Result<(), ApiError> {
        self.ensure_live("set")?;
        let property = self
            .model
            .schema()
            .property(name)
            .ok_or_else(|| ValidationError::UnknownFields(vec![name.to_string()]))?;
        let accepted = property.validate(name, value)?;
        self.record.set(name, accepted);
        Ok(())
    }

    /// Declared values in schema order.
    pub fn values(&self) -> Map<String, Value> {
        self.model
            .schema()
            .property_names()
            .map(|name| (name.to_string(), self.record.get(name).cloned().unwrap_or(Value::Null)))
            .collect()
    }

    /// Store through the adapter; the first call assigns the key.
    pub async fn persist(&mut self) -> Result<Key, ApiError> {
        self.ensure_live("persist")?;
        let key = self.model.adapter().persist(&mut self.record).await?;
        self.state = EntityState::Saved;
        Ok(key)
    }

    pub async fn delete(&mut self) -> Result<(), ApiError> {
        self.ensure_live("delete")?;
        if self.record.key().is_none() {
            return Err(ApiError::State(format!(
                "cannot delete {} entity that was never persisted",
                self.kind()
            )));
        }
        self.model.adapter().delete(&self.record).await?;
        self.state = EntityState::Deleted;
        Ok(())
    }

    /// Validate only the supplied fields, merge them and persist. On any failure
    /// the instance keeps its previous values.
    pub async fn update(&mut self, values: Map<String, Value>) -> Result<(), ApiError> {
        self.ensure_live("update")?;
        let accepted = self.model.schema().validate_partial(values)?;
        let mut merged = self.record.fields().clone();
        merged.extend(accepted);
        let previous = self.record.replace_fields(merged);
        if let Err(err) = self.persist().await {
            self.record.replace_fields(previous);
            return Err(err);
        }
        Ok(())
    }

    /// `{"_type": kind, "_key": key?, <field>: value, ...}`.
    pub fn as_wire_object(&self) -> Value {
        self.model.schema().wire_object(self.key(), self.record.fields())
    }

    fn ensure_live(&self, op: &str) -> Result<(), ApiError> {
        if self.state == EntityState::Deleted {
            return Err(ApiError::State(format!(
                "cannot {} deleted {} entity",
                op,
                self.kind()
            )));
        }
        Ok(())
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.key() == other.key() && self.values() == other.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::query::{Limit, Select};
    use crate::schema::{EntitySchema, Property};
    use crate::store::{MemoryBackend, StorageAdapter};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use serde_json::json;

    fn addressbook(backend: &Arc<MemoryBackend>) -> Arc<Model> {
        let schema = EntitySchema::builder("addressbook_entry")
            .property("name", Property::string().not_null().max_length(100))
            .property("email", Property::string().max_length(100))
            .property("age", Property::integer().min_value(0))
            .build()
            .unwrap();
        Arc::new(Model::new(schema, Arc::new(backend.adapter("addressbook_entry"))).unwrap())
    }

    fn values(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn lifecycle() {
        let backend = Arc::new(MemoryBackend::new());
        let model = addressbook(&backend);
        let mut fred = model
            .create(values(json!({"name": "Fred Bloggs", "email": "fred@bloggs.com"})))
            .unwrap();
        assert_eq!(fred.state(), EntityState::New);
        assert_eq!(fred.key(), None);
        assert_eq!(fred.get("age"), Some(&Value::Null));
        assert_eq!(fred.get("phone"), None);

        let key = fred.persist().await.unwrap();
        assert!(fred.is_saved());
        assert_eq!(fred.persist().await.unwrap(), key);

        fred.update(values(json!({"email": "fred@example.com"}))).await.unwrap();
        assert_eq!(fred.key(), Some(key));
        let stored = model.get_by_key(key).await.unwrap().unwrap();
        assert_eq!(stored.get("email"), Some(&json!("fred@example.com")));
        assert_eq!(stored, fred);

        fred.delete().await.unwrap();
        assert_eq!(fred.state(), EntityState::Deleted);
        assert!(model.get_by_key(key).await.unwrap().is_none());
        assert!(matches!(fred.persist().await, Err(ApiError::State(_))));
        assert!(matches!(fred.delete().await, Err(ApiError::State(_))));
        assert!(matches!(fred.set("name", json!("x")), Err(ApiError::State(_))));
    }

    #[tokio::test]
    async fn delete_requires_key() {
        let backend = Arc::new(MemoryBackend::new());
        let mut e = addressbook(&backend).create(values(json!({"name": "x"}))).unwrap();
        assert!(matches!(e.delete().await, Err(ApiError::State(_))));
    }

    #[test]
    fn set_revalidates() {
        let backend = Arc::new(MemoryBackend::new());
        let mut e = addressbook(&backend).create(values(json!({"name": "x"}))).unwrap();
        e.set("age", json!(30)).unwrap();
        assert_eq!(e.get("age"), Some(&json!(30)));
        assert!(matches!(
            e.set("age", json!(-1)),
            Err(ApiError::Validation(ValidationError::MinValue { .. }))
        ));
        assert!(matches!(
            e.set("name", Value::Null),
            Err(ApiError::Validation(ValidationError::Null { .. }))
        ));
        assert!(matches!(
            e.set("phone", json!("1")),
            Err(ApiError::Validation(ValidationError::UnknownFields(_)))
        ));
        assert_eq!(e.get("age"), Some(&json!(30)));
    }

    #[tokio::test]
    async fn update_rejects_unknown_fields_without_changes() {
        let backend = Arc::new(MemoryBackend::new());
        let mut e = addressbook(&backend).create(values(json!({"name": "x"}))).unwrap();
        e.persist().await.unwrap();
        let err = e
            .update(values(json!({"email": "new@x.y", "phone": "1", "fax": "2"})))
            .await
            .unwrap_err();
        match err {
            ApiError::Validation(ValidationError::UnknownFields(names)) => {
                assert_eq!(names.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(e.get("email"), Some(&Value::Null));
    }

    struct FailingStore;

    #[async_trait]
    impl StorageAdapter for FailingStore {
        fn entity_name(&self) -> &str {
            "addressbook_entry"
        }

        async fn fetch_by_primary_key(&self, _key: Key) -> Result<Option<Record>, StorageError> {
            Ok(None)
        }

        async fn persist(&self, _record: &mut Record) -> Result<Key, StorageError> {
            Err(StorageError::Poisoned)
        }

        async fn delete(&self, _record: &Record) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }

        async fn run(&self, _select: &Select, _limit: Option<Limit>) -> Result<Vec<Record>, StorageError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn failed_persist_rolls_back_update() {
        let schema = EntitySchema::builder("addressbook_entry")
            .property("name", Property::string())
            .build()
            .unwrap();
        let model = Arc::new(Model::new(schema, Arc::new(FailingStore)).unwrap());
        let record = Record::with_fields(Key::new(1), values(json!({"name": "old"})));
        let mut e = Entity::from_record(&model, record);
        let err = e.update(values(json!({"name": "new"}))).await.unwrap_err();
        assert!(matches!(err, ApiError::Storage(_)));
        assert_eq!(e.get("name"), Some(&json!("old")));
    }

    #[test]
    fn wire_object_omits_key_until_saved() {
        let backend = Arc::new(MemoryBackend::new());
        let e = addressbook(&backend)
            .create(values(json!({"name": "Fred", "email": "fred@bloggs.com"})))
            .unwrap();
        assert_eq!(
            e.as_wire_object(),
            json!({
                "_type": "addressbook_entry",
                "name": "Fred",
                "email": "fred@bloggs.com",
                "age": null
            })
        );
    }

    proptest! {
        #[test]
        fn wire_round_trip(
            name in "[a-zA-Z ]{0,100}",
            email in proptest::option::of("[a-z]{1,20}@[a-z]{1,20}\\.com"),
            age in proptest::option::of(0i64..200),
        ) {
            let backend = Arc::new(MemoryBackend::new());
            let model = addressbook(&backend);
            let mut raw = Map::new();
            raw.insert("name".into(), json!(name));
            raw.insert("email".into(), email.map_or(Value::Null, Value::from));
            raw.insert("age".into(), age.map_or(Value::Null, Value::from));
            let original = model.create(raw).unwrap();
            let decoded = model.decode(original.as_wire_object()).unwrap();
            prop_assert_eq!(decoded, original);
        }
    }
}
