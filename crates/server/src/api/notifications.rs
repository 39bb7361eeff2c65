//! Notification intent query endpoint.
//!
//! Intents are what the system wanted to tell the driver; delivery
//! happens out of band. This endpoint lets the driver-facing kiosk
//! poll by PO number.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use gatehouse_core::notify::NotificationIntent;

use crate::api::ApiError;
use crate::state::AppState;

const MAX_LIMIT: i64 = 200;
const DEFAULT_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct NotificationParams {
    /// Maximum number of intents to return (default 50, max 200)
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<NotificationIntent>,
}

/// List notification intents for a PO number, newest first.
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Path(po_number): Path<String>,
    Query(params): Query<NotificationParams>,
) -> Result<Json<NotificationsResponse>, (StatusCode, Json<ApiError>)> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let notifications = state
        .notifications()
        .list_by_po(&po_number, limit)
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError {
                    error: format!("Failed to list notifications: {}", e),
                }),
            )
        })?;

    Ok(Json(NotificationsResponse { notifications }))
}
