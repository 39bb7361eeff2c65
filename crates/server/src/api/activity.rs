//! Activity log query endpoint.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use gatehouse_core::audit::{ActivityFilter, ActivityRecord};

use crate::api::ApiError;
use crate::state::AppState;

/// Maximum allowed limit for activity queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for activity queries
const DEFAULT_LIMIT: i64 = 100;

/// Query parameters for the activity endpoint
#[derive(Debug, Deserialize)]
pub struct ActivityQueryParams {
    /// Filter by PO number
    pub po_number: Option<String>,
    /// Filter by event type
    pub event_type: Option<String>,
    /// Filter by user ID
    pub user_id: Option<String>,
    /// Filter events after this timestamp (ISO 8601)
    pub from: Option<DateTime<Utc>>,
    /// Filter events before this timestamp (ISO 8601)
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of events to return (default 100, max 1000)
    pub limit: Option<i64>,
    /// Pagination offset (default 0)
    pub offset: Option<i64>,
}

/// Response for the activity endpoint
#[derive(Debug, Serialize)]
pub struct ActivityQueryResponse {
    /// List of activity events, newest first
    pub events: Vec<ActivityRecord>,
    /// Total number of matching events
    pub total: i64,
    /// Limit used for this query
    pub limit: i64,
    /// Offset used for this query
    pub offset: i64,
}

/// Query the activity log.
pub async fn query_activity(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActivityQueryParams>,
) -> Result<Json<ActivityQueryResponse>, (StatusCode, Json<ApiError>)> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    // Base filter shared between query and count
    let mut base_filter = ActivityFilter::new();

    if let Some(ref po_number) = params.po_number {
        base_filter = base_filter.with_po_number(po_number);
    }

    if let Some(ref event_type) = params.event_type {
        base_filter = base_filter.with_event_type(event_type);
    }

    if let Some(ref user_id) = params.user_id {
        base_filter = base_filter.with_user_id(user_id);
    }

    if params.from.is_some() || params.to.is_some() {
        base_filter = base_filter.with_time_range(params.from, params.to);
    }

    let query_filter = ActivityFilter {
        limit,
        offset,
        ..base_filter.clone()
    };

    let events = state.activity_store().query(&query_filter).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError {
                error: format!("Failed to query activity log: {}", e),
            }),
        )
    })?;

    // Total count ignores pagination
    let total = state.activity_store().count(&base_filter).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError {
                error: format!("Failed to count activity events: {}", e),
            }),
        )
    })?;

    Ok(Json(ActivityQueryResponse {
        events,
        total,
        limit,
        offset,
    }))
}
