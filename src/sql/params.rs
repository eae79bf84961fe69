//! Values bound to record-table statements.

use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::{Query, QueryAs};

/// One positional parameter of a [`QueryBuf`](super::QueryBuf).
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    I64(i64),
    /// Bound as JSONB.
    Json(Value),
}

impl BindValue {
    /// Bind onto a statement that returns no typed rows.
    pub fn bind<'q>(&self, query: Query<'q, Postgres, PgArguments>) -> Query<'q, Postgres, PgArguments> {
        match self {
            BindValue::I64(n) => query.bind(*n),
            BindValue::Json(v) => query.bind(v.clone()),
        }
    }

    /// Bind onto a statement decoded into `O`.
    pub fn bind_as<'q, O>(
        &self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        match self {
            BindValue::I64(n) => query.bind(*n),
            BindValue::Json(v) => query.bind(v.clone()),
        }
    }
}
