pub mod activity;
pub mod handlers;
pub mod middleware;
pub mod notifications;
pub mod queue;
pub mod requests;
pub mod routes;
pub mod ws;

pub use routes::create_router;
pub use ws::WsBroadcaster;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use gatehouse_core::QueueError;

/// Error response body shared by all API endpoints.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

/// Map a queue error to its HTTP representation.
pub fn error_response(e: QueueError) -> (StatusCode, Json<ApiError>) {
    let status = match e {
        QueueError::NotFound(_) => StatusCode::NOT_FOUND,
        QueueError::CapacityExceeded => StatusCode::CONFLICT,
        QueueError::Validation(_) => StatusCode::BAD_REQUEST,
        QueueError::Consistency(_) | QueueError::PartialWrite(_) | QueueError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(ApiError {
            error: e.to_string(),
        }),
    )
}
