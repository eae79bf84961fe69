//! What a handler sees: the request context and its positional route arguments.

use super::Method;
use crate::entity::Entity;
use crate::error::ApiError;
use crate::model::{Model, ModelRegistry};
use crate::query::Limit;
use crate::store::Key;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Incoming request as handed over by the HTTP layer.
#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Request {
            method,
            path: path.into(),
            query: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_json(self, body: &Value) -> Self {
        self.with_body(body.to_string())
    }
}

/// Decoded POST/PUT body.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    /// POST object whose `_type` named a registered kind.
    Entity(Entity),
    /// PUT object whose `_type` named a registered kind. Only the supplied
    /// fields are present and validated.
    Partial { kind: String, values: Map<String, Value> },
    /// Any other JSON value.
    Json(Value),
}

/// Per-request view of the dispatcher handed to every handler.
#[derive(Clone, Debug)]
pub struct RequestContext {
    registry: Arc<ModelRegistry>,
    method: Method,
    path: String,
    query: HashMap<String, String>,
}

impl RequestContext {
    pub(crate) fn new(
        registry: Arc<ModelRegistry>,
        method: Method,
        path: String,
        query: HashMap<String, String>,
    ) -> Self {
        RequestContext {
            registry,
            method,
            path,
            query,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Registered model for `kind`; a handler bound to an unregistered kind is a wiring bug.
    pub fn model(&self, kind: &str) -> Result<Arc<Model>, ApiError> {
        self.registry
            .model(kind)
            .cloned()
            .ok_or_else(|| ApiError::State(format!("no model registered for kind '{}'", kind)))
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// The `limit` query parameter, validated before any query runs.
    pub fn limit(&self) -> Result<Option<Limit>, ApiError> {
        self.query_param("limit").map(str::parse).transpose()
    }
}

/// Path captures (left to right) plus the decoded body, if any.
#[derive(Clone, Debug, Default)]
pub struct RouteArgs {
    captures: Vec<String>,
    body: Option<Body>,
}

impl RouteArgs {
    pub fn new(captures: Vec<String>, body: Option<Body>) -> Self {
        RouteArgs { captures, body }
    }

    pub fn captures(&self) -> &[String] {
        &self.captures
    }

    pub fn capture(&self, index: usize) -> Result<&str, ApiError> {
        self.captures
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| ApiError::State(format!("route has no capture group {}", index)))
    }

    /// Capture `index` parsed as a primary key.
    pub fn key(&self, index: usize) -> Result<Key, ApiError> {
        let raw = self.capture(index)?;
        Key::parse(raw).ok_or_else(|| ApiError::BadRequest(format!("invalid key '{}'", raw)))
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }
}
