//! apikit: minimal REST API framework with regex route dispatch,
//! schema-validated entities and pluggable storage.

pub mod config;
pub mod dispatch;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod model;
pub mod query;
pub mod response;
pub mod routes;
pub mod schema;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{build_registry, connect_backend, load_schemas, resolve, SchemaConfig, Settings};
pub use dispatch::{Body, Dispatcher, DispatcherBuilder, Method, Request, RequestContext, RouteArgs};
pub use entity::{Entity, EntityState};
pub use error::{ApiError, ConfigError, StorageError, ValidationError};
pub use handlers::{register_all, register_crud};
pub use model::{Model, ModelRegistry};
pub use query::{Feed, Limit, Query, Select};
pub use response::{ApiResponse, HttpError, Reply};
pub use routes::{api_routes, common_routes};
pub use schema::{EntitySchema, Property, PropertyKind};
pub use state::AppState;
pub use store::{Key, MemoryBackend, PostgresBackend, Record, StorageAdapter, StorageBackend};
