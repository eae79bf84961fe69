//! In-memory document store: kind -> key -> fields, one key counter for all kinds.

use crate::error::StorageError;
use crate::query::{Limit, Select};
use crate::store::{Key, Record, StorageAdapter};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct MemoryState {
    last_key: u64,
    kinds: HashMap<String, BTreeMap<Key, Map<String, Value>>>,
}

/// Shared storage for every memory adapter created from it.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adapter(self: &Arc<Self>, kind: impl Into<String>) -> MemoryStore {
        MemoryStore {
            backend: Arc::clone(self),
            kind: kind.into(),
        }
    }

    /// Number of stored records of `kind`.
    pub fn count(&self, kind: &str) -> Result<usize, StorageError> {
        Ok(self.read()?.kinds.get(kind).map_or(0, BTreeMap::len))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>, StorageError> {
        self.state.read().map_err(|_| StorageError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, StorageError> {
        self.state.write().map_err(|_| StorageError::Poisoned)
    }
}

/// Adapter for one kind inside a [`MemoryBackend`].
#[derive(Clone, Debug)]
pub struct MemoryStore {
    backend: Arc<MemoryBackend>,
    kind: String,
}

#[async_trait]
impl StorageAdapter for MemoryStore {
    fn entity_name(&self) -> &str {
        &self.kind
    }

    async fn fetch_by_primary_key(&self, key: Key) -> Result<Option<Record>, StorageError> {
        let state = self.backend.read()?;
        Ok(state
            .kinds
            .get(&self.kind)
            .and_then(|records| records.get(&key))
            .map(|fields| Record::with_fields(Some(key), fields.clone())))
    }

    async fn persist(&self, record: &mut Record) -> Result<Key, StorageError> {
        let mut state = self.backend.write()?;
        let key = match record.key() {
            Some(key) => key,
            None => {
                let key = state
                    .last_key
                    .checked_add(1)
                    .and_then(Key::new)
                    .ok_or_else(|| StorageError::KeysExhausted {
                        kind: self.kind.clone(),
                    })?;
                state.last_key = key.get();
                key
            }
        };
        state
            .kinds
            .entry(self.kind.clone())
            .or_default()
            .insert(key, record.fields().clone());
        drop(state);
        record.assign_key(key);
        tracing::debug!(kind = %self.kind, key = %key, "persisted record");
        Ok(key)
    }

    async fn delete(&self, record: &Record) -> Result<(), StorageError> {
        let key = record.key().ok_or_else(|| StorageError::NotPersisted {
            kind: self.kind.clone(),
        })?;
        let mut state = self.backend.write()?;
        let removed = state
            .kinds
            .get_mut(&self.kind)
            .and_then(|records| records.remove(&key));
        match removed {
            Some(_) => {
                tracing::debug!(kind = %self.kind, key = %key, "deleted record");
                Ok(())
            }
            None => Err(StorageError::Missing {
                kind: self.kind.clone(),
                key,
            }),
        }
    }

    async fn run(&self, _select: &Select, limit: Option<Limit>) -> Result<Vec<Record>, StorageError> {
        let state = self.backend.read()?;
        let Some(records) = state.kinds.get(&self.kind) else {
            return Ok(Vec::new());
        };
        let take = limit.map_or(usize::MAX, Limit::get);
        Ok(records
            .iter()
            .take(take)
            .map(|(key, fields)| Record::with_fields(Some(*key), fields.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntitySchema, Property};
    use serde_json::json;

    fn record(name: &str) -> Record {
        let mut r = Record::new();
        r.set("name", json!(name));
        r
    }

    fn select(kind: &str) -> Select {
        let schema = EntitySchema::builder(kind)
            .property("name", Property::string())
            .build()
            .unwrap();
        Select::new(&schema)
    }

    #[tokio::test]
    async fn keys_increase_across_kinds() {
        let backend = Arc::new(MemoryBackend::new());
        let people = backend.adapter("person");
        let pets = backend.adapter("pet");

        let mut a = record("a");
        let mut b = record("b");
        let mut c = record("c");
        assert_eq!(people.persist(&mut a).await.unwrap().get(), 1);
        assert_eq!(pets.persist(&mut b).await.unwrap().get(), 2);
        assert_eq!(people.persist(&mut c).await.unwrap().get(), 3);
        assert_eq!(backend.count("person").unwrap(), 2);
        assert_eq!(backend.count("pet").unwrap(), 1);
        assert!(pets.fetch_by_primary_key(a.key().unwrap()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn persist_reuses_existing_key() {
        let backend = Arc::new(MemoryBackend::new());
        let store = backend.adapter("person");
        let mut r = record("before");
        let key = store.persist(&mut r).await.unwrap();
        r.set("name", json!("after"));
        assert_eq!(store.persist(&mut r).await.unwrap(), key);

        let fetched = store.fetch_by_primary_key(key).await.unwrap().unwrap();
        assert_eq!(fetched.get("name"), Some(&json!("after")));
        assert_eq!(backend.count("person").unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_requires_persisted_record() {
        let backend = Arc::new(MemoryBackend::new());
        let store = backend.adapter("person");
        let mut r = record("x");
        assert!(matches!(
            store.delete(&r).await,
            Err(StorageError::NotPersisted { .. })
        ));
        store.persist(&mut r).await.unwrap();
        store.delete(&r).await.unwrap();
        assert!(matches!(store.delete(&r).await, Err(StorageError::Missing { .. })));
    }

    #[tokio::test]
    async fn run_is_ordered_and_limited() {
        let backend = Arc::new(MemoryBackend::new());
        let store = backend.adapter("person");
        for name in ["a", "b", "c"] {
            store.persist(&mut record(name)).await.unwrap();
        }
        let all = store.run(&select("person"), None).await.unwrap();
        let names: Vec<&Value> = all.iter().filter_map(|r| r.get("name")).collect();
        assert_eq!(names, vec![&json!("a"), &json!("b"), &json!("c")]);

        let two = store.run(&select("person"), Limit::new(2)).await.unwrap();
        assert_eq!(two.len(), 2);
        assert!(backend.adapter("nobody").run(&select("nobody"), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_only_lists_own_kind() {
        let backend = Arc::new(MemoryBackend::new());
        let people = backend.adapter("person");
        let pets = backend.adapter("pet");
        people.persist(&mut record("ann")).await.unwrap();
        pets.persist(&mut record("rex")).await.unwrap();

        let listed = pets.run(&select("person"), None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].get("name"), Some(&json!("rex")));
    }
}
