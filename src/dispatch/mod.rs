//! Route table and dispatcher: (method, path) -> handler, first match wins.
//!
//! Per request: match route -> decode body (POST/PUT) -> call handler -> build response.
//! The dispatcher is the only place a result or error becomes an [`ApiResponse`].

mod request;

pub use request::{Body, Request, RequestContext, RouteArgs};

use crate::error::{ApiError, ConfigError};
use crate::model::ModelRegistry;
use crate::response::{ApiResponse, Reply};
use crate::schema::{json_type_name, TYPE_FIELD};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "DELETE" => Some(Method::Delete),
            _ => None,
        }
    }

    /// Methods outside GET/POST/PUT/DELETE have no routes.
    pub fn from_http(method: &axum::http::Method) -> Option<Self> {
        Self::parse(method.as_str())
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Only POST and PUT bodies are decoded and passed to handlers.
    pub const fn carries_body(self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Reply, ApiError>> + Send>>;
pub type Handler = Arc<dyn Fn(RequestContext, RouteArgs) -> HandlerFuture + Send + Sync>;

pub struct Route {
    method: Method,
    source: String,
    pattern: Regex,
    handler: Handler,
}

impl Route {
    pub fn method(&self) -> Method {
        self.method
    }

    /// Pattern as registered.
    pub fn pattern(&self) -> &str {
        &self.source
    }

    /// Captures of a whole-path match, left to right; groups that did not
    /// participate yield empty strings.
    fn captures(&self, path: &str) -> Option<Vec<String>> {
        let caps = self.pattern.captures(path)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|m| m.map_or_else(String::new, |m| m.as_str().to_string()))
                .collect(),
        )
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.source)
            .finish()
    }
}

/// Ordered route table bound to a model registry. Built once, then shared read-only.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<ModelRegistry>,
    routes: Vec<Route>,
}

impl Dispatcher {
    pub fn builder(registry: Arc<ModelRegistry>) -> DispatcherBuilder {
        DispatcherBuilder {
            registry,
            routes: Vec::new(),
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// First route with the same method whose pattern matches the whole path.
    pub fn match_route(&self, method: Method, path: &str) -> Option<(&Route, Vec<String>)> {
        self.routes
            .iter()
            .filter(|r| r.method == method)
            .find_map(|r| r.captures(path).map(|caps| (r, caps)))
    }

    /// Empty body -> `None`; object with a registered `_type` -> entity for
    /// POST, partial values for PUT; anything else that parses -> raw JSON.
    pub fn decode_body(&self, method: Method, body: &[u8]) -> Result<Option<Body>, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let value: Value = serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        let kind = match value.get(TYPE_FIELD) {
            None => return Ok(Some(Body::Json(value))),
            Some(Value::String(kind)) => kind.clone(),
            Some(other) => {
                return Err(ApiError::Decode(format!(
                    "{} must be a string, got {}",
                    TYPE_FIELD,
                    json_type_name(other)
                )))
            }
        };
        let model = self
            .registry
            .model(&kind)
            .ok_or_else(|| ApiError::Decode(format!("unknown {} '{}'", TYPE_FIELD, kind)))?;
        if method == Method::Put {
            let values = model.schema().decode_partial(value)?;
            return Ok(Some(Body::Partial { kind, values }));
        }
        Ok(Some(Body::Entity(model.decode(value)?)))
    }

    /// Match, decode and call the handler; errors are returned, not rendered.
    pub async fn route_request(&self, request: Request) -> Result<Reply, ApiError> {
        let Request {
            method,
            path,
            query,
            body,
        } = request;
        let (route, captures) = self
            .match_route(method, &path)
            .ok_or_else(|| ApiError::RouteNotFound { path: path.clone() })?;
        tracing::debug!(%method, %path, pattern = %route.source, "matched route");
        let body = if method.carries_body() {
            self.decode_body(method, &body)?
        } else {
            None
        };
        let handler = Arc::clone(&route.handler);
        let ctx = RequestContext::new(Arc::clone(&self.registry), method, path, query);
        handler(ctx, RouteArgs::new(captures, body)).await
    }

    /// Full request cycle ending in the wire response.
    pub async fn dispatch(&self, request: Request) -> ApiResponse {
        let method = request.method;
        let path = request.path.clone();
        match self.route_request(request).await {
            Ok(reply) => ApiResponse::ok(reply.into_wire()),
            Err(err) => {
                if err.is_server_error() {
                    tracing::warn!(%method, %path, error = %err, "request failed");
                } else {
                    tracing::debug!(%method, %path, error = %err, "request rejected");
                }
                ApiResponse::from_error(&err)
            }
        }
    }
}

/// Collects routes in registration order; `build` compiles the patterns.
pub struct DispatcherBuilder {
    registry: Arc<ModelRegistry>,
    routes: Vec<(Method, String, Handler)>,
}

impl DispatcherBuilder {
    /// Register `handler` for `method` on `pattern`, a regular expression that
    /// must match the whole path.
    pub fn route<F, Fut, R>(mut self, method: Method, pattern: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RequestContext, RouteArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ApiError>> + Send + 'static,
        R: Into<Reply>,
    {
        let handler: Handler = Arc::new(move |ctx: RequestContext, args: RouteArgs| -> HandlerFuture {
            let fut = handler(ctx, args);
            Box::pin(async move { fut.await.map(Into::into) })
        });
        self.routes.push((method, pattern.into(), handler));
        self
    }

    pub fn get<F, Fut, R>(self, pattern: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RequestContext, RouteArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ApiError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route(Method::Get, pattern, handler)
    }

    pub fn post<F, Fut, R>(self, pattern: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RequestContext, RouteArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ApiError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route(Method::Post, pattern, handler)
    }

    pub fn put<F, Fut, R>(self, pattern: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RequestContext, RouteArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ApiError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route(Method::Put, pattern, handler)
    }

    pub fn delete<F, Fut, R>(self, pattern: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RequestContext, RouteArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ApiError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route(Method::Delete, pattern, handler)
    }

    pub fn build(self) -> Result<Dispatcher, ConfigError> {
        let mut routes = Vec::with_capacity(self.routes.len());
        for (method, source, handler) in self.routes {
            let pattern = Regex::new(&format!("^(?:{})$", source)).map_err(|e| ConfigError::InvalidRoute {
                pattern: source.clone(),
                source: e,
            })?;
            routes.push(Route {
                method,
                source,
                pattern,
                handler,
            });
        }
        Ok(Dispatcher {
            registry: self.registry,
            routes,
        })
    }
}
