//! axum routers: the dispatcher-backed API surface and service endpoints.

mod api;
mod common;

pub use api::api_routes;
pub use common::common_routes;
