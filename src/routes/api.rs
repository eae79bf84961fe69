//! API surface: every request under the mount point goes through the dispatcher.

use crate::dispatch::{Method, Request};
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Query, State},
    http::{self, StatusCode, Uri},
    middleware::map_response,
    response::{IntoResponse, Response},
    Router,
};
use std::collections::HashMap;
use tower_http::limit::RequestBodyLimitLayer;

/// Router whose fallback hands method, path, query and body to the dispatcher.
/// Mount it with `Router::nest` to serve under a prefix.
pub fn api_routes(state: AppState) -> Router {
    let limit = state.max_body_bytes;
    Router::new()
        .fallback(dispatch)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(limit))
        .layer(map_response(move |response: Response| async move {
            // RequestBodyLimitLayer answers a too-large Content-Length with a bare 413.
            if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
                return ApiResponse::from_error(&body_too_large(limit)).into_response();
            }
            response
        }))
        .with_state(state)
}

fn body_too_large(limit: usize) -> ApiError {
    ApiError::BadRequest(format!("request body exceeds {} bytes", limit))
}

async fn dispatch(
    State(state): State<AppState>,
    method: http::Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let path = uri.path().to_string();
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            let err = match rejection.status() {
                StatusCode::PAYLOAD_TOO_LARGE => body_too_large(state.max_body_bytes),
                _ => ApiError::BadRequest(rejection.body_text()),
            };
            tracing::debug!(%path, error = %err, "request body rejected");
            return ApiResponse::from_error(&err).into_response();
        }
    };
    let Some(method) = Method::from_http(&method) else {
        return ApiResponse::from_error(&ApiError::RouteNotFound { path }).into_response();
    };
    let request = Request {
        method,
        path,
        query,
        body: body.to_vec(),
    };
    state.dispatcher.dispatch(request).await.into_response()
}
