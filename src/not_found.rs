//! The fallback for requests that do not match any route.

use axum::{
    Json,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Respond with `404 Not Found` and a JSON error naming the unknown path.
pub async fn get_404_not_found(uri: Uri) -> Response {
    tracing::debug!("No route for {uri}");

    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("no route for {}", uri.path()) })),
    )
        .into_response()
}
