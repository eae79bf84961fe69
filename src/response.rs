//! Response shapes: handler replies, the error body, and the status + JSON pair
//! the HTTP layer writes.

use crate::entity::Entity;
use crate::error::ApiError;
use crate::query::Feed;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_SERVER_ERROR: u16 = 500;

/// Reason used when an error carries none of its own.
pub fn default_reason(code: u16) -> String {
    match code {
        STATUS_OK => "OK".into(),
        STATUS_BAD_REQUEST => "Bad Request".into(),
        STATUS_NOT_FOUND => "Resource not found".into(),
        STATUS_SERVER_ERROR => "Server Error".into(),
        other => format!("Error Code {}", other),
    }
}

/// Wire error body: `{"code": .., "reason": ..}`, sent with status = code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpError {
    pub code: u16,
    pub reason: String,
}

impl HttpError {
    pub fn new(code: u16, reason: Option<String>) -> Self {
        HttpError {
            code,
            reason: reason.unwrap_or_else(|| default_reason(code)),
        }
    }

    pub fn as_json(&self) -> Value {
        serde_json::json!({ "code": self.code, "reason": self.reason })
    }
}

/// What a handler hands back to the dispatcher.
#[derive(Debug)]
pub enum Reply {
    Json(Value),
    Entity(Entity),
    Feed(Feed),
}

impl Reply {
    pub fn into_wire(self) -> Value {
        match self {
            Reply::Json(v) => v,
            Reply::Entity(e) => e.as_wire_object(),
            Reply::Feed(f) => f.as_wire_object(),
        }
    }
}

impl From<Value> for Reply {
    fn from(v: Value) -> Self {
        Reply::Json(v)
    }
}

impl From<bool> for Reply {
    fn from(b: bool) -> Self {
        Reply::Json(Value::Bool(b))
    }
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Reply::Json(Value::String(s))
    }
}

impl From<Vec<Value>> for Reply {
    fn from(items: Vec<Value>) -> Self {
        Reply::Json(Value::Array(items))
    }
}

impl From<Entity> for Reply {
    fn from(e: Entity) -> Self {
        Reply::Entity(e)
    }
}

impl From<Feed> for Reply {
    fn from(f: Feed) -> Self {
        Reply::Feed(f)
    }
}

/// Status and JSON body of a finished request.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        ApiResponse {
            status: STATUS_OK,
            body,
        }
    }

    pub fn from_error(err: &ApiError) -> Self {
        let http = HttpError::from(err);
        ApiResponse {
            status: http.code,
            body: http.as_json(),
        }
    }
}

impl From<Result<Reply, ApiError>> for ApiResponse {
    fn from(result: Result<Reply, ApiError>) -> Self {
        match result {
            Ok(reply) => ApiResponse::ok(reply.into_wire()),
            Err(err) => ApiResponse::from_error(&err),
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reasons() {
        assert_eq!(HttpError::new(400, None).reason, "Bad Request");
        assert_eq!(HttpError::new(404, None).reason, "Resource not found");
        assert_eq!(HttpError::new(500, None).reason, "Server Error");
        assert_eq!(HttpError::new(418, None).reason, "Error Code 418");
        assert_eq!(HttpError::new(404, Some("gone".into())).reason, "gone");
    }

    #[test]
    fn error_response_carries_code_as_status() {
        let resp = ApiResponse::from_error(&ApiError::RouteNotFound { path: "/nope".into() });
        assert_eq!(resp.status, 404);
        assert_eq!(
            resp.body,
            serde_json::json!({ "code": 404, "reason": "Not found, unknown path: /nope" })
        );
    }

    #[test]
    fn plain_replies_pass_through() {
        let resp = ApiResponse::from(Ok(Reply::from(true)));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, Value::Bool(true));
    }
}
