//! Typed errors and HTTP mapping.

use crate::response::{HttpError, STATUS_BAD_REQUEST, STATUS_NOT_FOUND, STATUS_SERVER_ERROR};
use crate::store::Key;
use thiserror::Error;

/// Startup problems: schema definitions, route table, settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid schema '{kind}': {reason}")]
    InvalidSchema { kind: String, reason: String },
    #[error("duplicate kind: {0}")]
    DuplicateKind(String),
    #[error("adapter for '{adapter}' cannot back schema '{kind}'")]
    AdapterMismatch { kind: String, adapter: String },
    #[error("invalid route pattern '{pattern}': {source}")]
    InvalidRoute {
        pattern: String,
        source: regex::Error,
    },
    #[error("setting {name}: {reason}")]
    Setting { name: &'static str, reason: String },
    #[error("config load: {0}")]
    Load(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A property constraint was violated. Always reported as 400.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("value cannot be null for property '{property}'")]
    Null { property: String },
    #[error("not {expected} for property '{property}'")]
    WrongType {
        property: String,
        expected: &'static str,
    },
    #[error("MINLENGTH condition fails for property '{property}' (at least {min} characters)")]
    MinLength { property: String, min: usize },
    #[error("MAXLENGTH condition fails for property '{property}' (at most {max} characters)")]
    MaxLength { property: String, max: usize },
    #[error("MINVALUE condition fails for property '{property}' (at least {min})")]
    MinValue { property: String, min: i64 },
    #[error("MAXVALUE condition fails for property '{property}' (at most {max})")]
    MaxValue { property: String, max: i64 },
    #[error("key must be a positive integer for property '{property}'")]
    NonPositiveKey { property: String },
    #[error("invalid data: unknown fields {}", .0.join(", "))]
    UnknownFields(Vec<String>),
}

impl ValidationError {
    /// Property the error refers to, if it names a single one.
    pub fn property(&self) -> Option<&str> {
        match self {
            Self::Null { property }
            | Self::WrongType { property, .. }
            | Self::MinLength { property, .. }
            | Self::MaxLength { property, .. }
            | Self::MinValue { property, .. }
            | Self::MaxValue { property, .. }
            | Self::NonPositiveKey { property } => Some(property),
            Self::UnknownFields(_) => None,
        }
    }
}

/// Backend failures raised by storage adapters.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("{kind} record has never been persisted")]
    NotPersisted { kind: String },
    #[error("no {kind} record with key {key}")]
    Missing { kind: String, key: Key },
    #[error("corrupt {kind} record: {reason}")]
    Corrupt { kind: String, reason: String },
    #[error("{kind} key space exhausted")]
    KeysExhausted { kind: String },
    #[error("storage lock poisoned")]
    Poisoned,
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

/// Every failure a request can end in. The dispatcher is the only place these
/// become wire responses.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Bad request: {0}")]
    Decode(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Not found, unknown path: {path}")]
    RouteNotFound { path: String },
    #[error("No {kind} entity with key {key}")]
    EntityNotFound { kind: String, key: Key },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("invalid state: {0}")]
    State(String),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Validation(_) | ApiError::Decode(_) | ApiError::BadRequest(_) => {
                STATUS_BAD_REQUEST
            }
            ApiError::RouteNotFound { .. } | ApiError::EntityNotFound { .. } => STATUS_NOT_FOUND,
            ApiError::Storage(_) | ApiError::State(_) => STATUS_SERVER_ERROR,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status() >= STATUS_SERVER_ERROR
    }
}

impl From<&ApiError> for HttpError {
    fn from(err: &ApiError) -> Self {
        HttpError::new(err.status(), Some(err.to_string()))
    }
}
