//! Storage adapters: the seam between entity logic and a concrete backend.

pub mod memory;
pub mod postgres;
mod record;

pub use memory::{MemoryBackend, MemoryStore};
pub use postgres::{PostgresBackend, PostgresStore};
pub use record::{Key, Record};

use crate::error::StorageError;
use crate::query::{Limit, Select};
use crate::schema::EntitySchema;
use async_trait::async_trait;
use std::sync::Arc;

/// Capability set every backend provides for one entity kind. Implementations
/// own the thread safety of whatever they share (locks, pools).
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    fn entity_name(&self) -> &str;

    fn new_record(&self) -> Record {
        Record::new()
    }

    async fn fetch_by_primary_key(&self, key: Key) -> Result<Option<Record>, StorageError>;

    /// Store the record, assigning its key when it has none. Last write wins.
    async fn persist(&self, record: &mut Record) -> Result<Key, StorageError>;

    /// Remove a persisted record. Fails for records without a key or unknown keys.
    async fn delete(&self, record: &Record) -> Result<(), StorageError>;

    fn build_query(&self, schema: &EntitySchema) -> Select {
        Select::new(schema)
    }

    /// Enumerate every record of the kind, truncated to `limit`. The order is
    /// backend-defined but stable for a fixed backend state.
    async fn run(&self, select: &Select, limit: Option<Limit>) -> Result<Vec<Record>, StorageError>;
}

/// Backend chosen at registration time; hands out one adapter per kind.
#[derive(Clone, Debug)]
pub enum StorageBackend {
    Memory(Arc<MemoryBackend>),
    Postgres(PostgresBackend),
}

impl StorageBackend {
    pub fn memory() -> Self {
        StorageBackend::Memory(Arc::new(MemoryBackend::new()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            StorageBackend::Memory(_) => "memory",
            StorageBackend::Postgres(_) => "postgres",
        }
    }

    /// Adapter for `kind`, creating backing tables where the backend needs them.
    pub async fn adapter(&self, kind: &str) -> Result<Arc<dyn StorageAdapter>, StorageError> {
        Ok(match self {
            StorageBackend::Memory(backend) => Arc::new(backend.adapter(kind)),
            StorageBackend::Postgres(backend) => {
                backend.ensure_table(kind).await?;
                Arc::new(backend.adapter(kind))
            }
        })
    }
}
