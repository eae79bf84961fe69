//! Builds the parameterized statements behind one record table per entity kind.
//!
//! Layout: `id BIGSERIAL PRIMARY KEY, payload JSONB NOT NULL, updated_at TIMESTAMPTZ`.

use super::BindValue;
use crate::store::Key;
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL.
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

fn key_param(key: Key) -> BindValue {
    // Keys handed out by BIGSERIAL always fit; larger ones cannot match a row.
    BindValue::I64(i64::try_from(key.get()).unwrap_or(-1))
}

pub fn create_schema(schema: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema))
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl QueryBuf {
    fn new(sql: String) -> Self {
        QueryBuf {
            sql,
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: BindValue) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// Statement set for the table backing `kind` inside `schema`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordTable {
    schema: String,
    kind: String,
}

impl RecordTable {
    pub fn new(schema: impl Into<String>, kind: impl Into<String>) -> Self {
        RecordTable {
            schema: schema.into(),
            kind: kind.into(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn qualified_name(&self) -> String {
        qualified_table(&self.schema, &self.kind)
    }

    pub fn create_table(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (id BIGSERIAL PRIMARY KEY, payload JSONB NOT NULL, updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW())",
            self.qualified_name()
        )
    }

    /// SELECT by primary key.
    pub fn select_by_key(&self, key: Key) -> QueryBuf {
        let mut q = QueryBuf::new(String::new());
        let n = q.push_param(key_param(key));
        q.sql = format!("SELECT id, payload FROM {} WHERE id = ${}", self.qualified_name(), n);
        q
    }

    /// INSERT with a generated key; returns the new id.
    pub fn insert(&self, payload: &Map<String, Value>) -> QueryBuf {
        let mut q = QueryBuf::new(String::new());
        let n = q.push_param(BindValue::Json(Value::Object(payload.clone())));
        q.sql = format!("INSERT INTO {} (payload) VALUES (${}) RETURNING id", self.qualified_name(), n);
        q
    }

    /// INSERT or overwrite the row with `key`; returns the id.
    pub fn upsert(&self, key: Key, payload: &Map<String, Value>) -> QueryBuf {
        let mut q = QueryBuf::new(String::new());
        let k = q.push_param(key_param(key));
        let p = q.push_param(BindValue::Json(Value::Object(payload.clone())));
        q.sql = format!(
            "INSERT INTO {} (id, payload) VALUES (${}, ${}) ON CONFLICT (id) DO UPDATE SET payload = EXCLUDED.payload, updated_at = NOW() RETURNING id",
            self.qualified_name(),
            k,
            p
        );
        q
    }

    pub fn delete(&self, key: Key) -> QueryBuf {
        let mut q = QueryBuf::new(String::new());
        let n = q.push_param(key_param(key));
        q.sql = format!("DELETE FROM {} WHERE id = ${}", self.qualified_name(), n);
        q
    }

    /// Every row ordered by key, with an optional LIMIT.
    pub fn select_all(&self, limit: Option<usize>) -> QueryBuf {
        let mut q = QueryBuf::new(format!(
            "SELECT id, payload FROM {} ORDER BY id",
            self.qualified_name()
        ));
        if let Some(limit) = limit {
            let n = q.push_param(BindValue::I64(i64::try_from(limit).unwrap_or(i64::MAX)));
            q.sql.push_str(&format!(" LIMIT ${}", n));
        }
        q
    }
}
