//! Listing queries: `Select` describes the scan, `Query` runs it, `Feed` holds the page.

use crate::entity::Entity;
use crate::error::ApiError;
use crate::model::Model;
use crate::schema::EntitySchema;
use serde::Serialize;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;

/// Positive row limit for a listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Limit(NonZeroUsize);

impl Limit {
    pub fn new(n: usize) -> Option<Self> {
        NonZeroUsize::new(n).map(Limit)
    }

    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl FromStr for Limit {
    type Err = ApiError;

    /// Accepts decimal digits only; zero, negatives and non-numbers are 400s.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ApiError::BadRequest(format!("limit must be a positive integer, got '{}'", s));
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        s.parse::<usize>().ok().and_then(Limit::new).ok_or_else(invalid)
    }
}

/// All entities of one kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Select {
    kind: String,
    columns: Vec<String>,
}

impl Select {
    pub fn new(schema: &EntitySchema) -> Self {
        Select {
            kind: schema.kind().to_string(),
            columns: schema.property_names().map(str::to_string).collect(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn as_sql(&self) -> String {
        format!("SELECT * FROM {}", self.kind)
    }

    /// Positional bindings for `as_sql`; a full scan has none.
    pub fn bindings(&self) -> Vec<Value> {
        Vec::new()
    }
}

pub struct Query {
    model: Arc<Model>,
}

impl Query {
    pub fn new(model: Arc<Model>) -> Self {
        Query { model }
    }

    pub fn select(&self) -> Select {
        self.model.adapter().build_query(self.model.schema())
    }

    pub async fn execute(&self, limit: Option<Limit>) -> Result<Feed, ApiError> {
        let select = self.select();
        tracing::debug!(sql = %select.as_sql(), limit = ?limit.map(Limit::get), "query");
        let mut records = self.model.adapter().run(&select, limit).await?;
        if let Some(limit) = limit {
            records.truncate(limit.get());
        }
        let items = records
            .into_iter()
            .map(|r| Entity::from_record(&self.model, r))
            .collect();
        Ok(Feed {
            kind: self.model.kind().to_string(),
            limit,
            items,
        })
    }
}

/// Materialized listing result.
#[derive(Clone, Debug, PartialEq)]
pub struct Feed {
    kind: String,
    limit: Option<Limit>,
    items: Vec<Entity>,
}

impl Feed {
    pub fn new(kind: impl Into<String>, limit: Option<Limit>) -> Self {
        Feed {
            kind: kind.into(),
            limit,
            items: Vec::new(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn limit(&self) -> Option<Limit> {
        self.limit
    }

    pub fn items(&self) -> &[Entity] {
        &self.items
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn append(&mut self, entity: Entity) -> Result<(), ApiError> {
        if entity.kind() != self.kind {
            return Err(ApiError::State(format!(
                "cannot add {} entity to {} feed",
                entity.kind(),
                self.kind
            )));
        }
        self.items.push(entity);
        Ok(())
    }

    /// `{"_type": kind, "limit": n|null, "items": [...], "count": n}`.
    pub fn as_wire_object(&self) -> Value {
        serde_json::json!({
            "_type": self.kind,
            "limit": self.limit,
            "items": self.items.iter().map(Entity::as_wire_object).collect::<Vec<_>>(),
            "count": self.count(),
        })
    }
}
