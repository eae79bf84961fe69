//! Relational store: one JSONB record table per kind in a PostgreSQL schema.

use crate::error::StorageError;
use crate::query::{Limit, Select};
use crate::sql::{self, QueryBuf, RecordTable};
use crate::store::{Key, Record, StorageAdapter};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Pool plus the schema that holds every record table.
#[derive(Clone, Debug)]
pub struct PostgresBackend {
    pool: PgPool,
    schema: String,
}

impl PostgresBackend {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PostgresBackend {
            pool,
            schema: schema.into(),
        }
    }

    /// Connect and create the schema if missing.
    pub async fn connect(
        database_url: &str,
        schema: impl Into<String>,
        max_connections: u32,
    ) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        let backend = Self::new(pool, schema);
        let ddl = sql::create_schema(&backend.schema);
        tracing::debug!(sql = %ddl, "ensure schema");
        sqlx::query(&ddl).execute(&backend.pool).await?;
        Ok(backend)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the record table for `kind` if it does not exist.
    pub async fn ensure_table(&self, kind: &str) -> Result<(), StorageError> {
        let ddl = RecordTable::new(&self.schema, kind).create_table();
        tracing::debug!(sql = %ddl, "ensure table");
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }

    pub fn adapter(&self, kind: impl Into<String>) -> PostgresStore {
        PostgresStore {
            pool: self.pool.clone(),
            table: RecordTable::new(&self.schema, kind),
        }
    }
}

/// Adapter for one kind's record table.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
    table: RecordTable,
}

impl PostgresStore {
    fn row_to_record(&self, (id, payload): (i64, Value)) -> Result<Record, StorageError> {
        let key = Key::try_from(id).map_err(|id| self.corrupt(format!("invalid id {}", id)))?;
        match payload {
            Value::Object(fields) => Ok(Record::with_fields(Some(key), fields)),
            _ => Err(self.corrupt(format!("payload of {} is not an object", key))),
        }
    }

    fn corrupt(&self, reason: String) -> StorageError {
        StorageError::Corrupt {
            kind: self.table.kind().to_string(),
            reason,
        }
    }

    async fn fetch_rows(&self, q: &QueryBuf) -> Result<Vec<(i64, Value)>, StorageError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_as::<_, (i64, Value)>(&q.sql);
        for p in &q.params {
            query = p.bind_as(query);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn returning_id(&self, q: &QueryBuf) -> Result<i64, StorageError> {
        tracing::debug!(sql = %q.sql, "query");
        let mut query = sqlx::query_as::<_, (i64,)>(&q.sql);
        for p in &q.params {
            query = p.bind_as(query);
        }
        let (id,) = query.fetch_one(&self.pool).await?;
        Ok(id)
    }
}

#[async_trait]
impl StorageAdapter for PostgresStore {
    fn entity_name(&self) -> &str {
        self.table.kind()
    }

    async fn fetch_by_primary_key(&self, key: Key) -> Result<Option<Record>, StorageError> {
        let q = self.table.select_by_key(key);
        let row = self.fetch_rows(&q).await?.into_iter().next();
        row.map(|r| self.row_to_record(r)).transpose()
    }

    async fn persist(&self, record: &mut Record) -> Result<Key, StorageError> {
        let q = match record.key() {
            Some(key) => self.table.upsert(key, record.fields()),
            None => self.table.insert(record.fields()),
        };
        let id = self.returning_id(&q).await?;
        let key = Key::try_from(id).map_err(|id| self.corrupt(format!("invalid id {}", id)))?;
        record.assign_key(key);
        Ok(key)
    }

    async fn delete(&self, record: &Record) -> Result<(), StorageError> {
        let key = record.key().ok_or_else(|| StorageError::NotPersisted {
            kind: self.table.kind().to_string(),
        })?;
        let q = self.table.delete(key);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = p.bind(query);
        }
        let result = query.execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::Missing {
                kind: self.table.kind().to_string(),
                key,
            });
        }
        Ok(())
    }

    async fn run(&self, _select: &Select, limit: Option<Limit>) -> Result<Vec<Record>, StorageError> {
        let q = self.table.select_all(limit.map(Limit::get));
        self.fetch_rows(&q)
            .await?
            .into_iter()
            .map(|r| self.row_to_record(r))
            .collect()
    }
}
