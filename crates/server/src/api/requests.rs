//! Join request API handlers: submit, list, approve, reject.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use gatehouse_core::ticket::{JoinFields, LoadType, PendingRequest, Ticket};

use crate::api::middleware::Caller;
use crate::api::{error_response, ApiError};
use crate::state::AppState;

/// Request body for submitting a join request or creating a manual ticket.
#[derive(Debug, Deserialize)]
pub struct JoinBody {
    pub po_number: String,
    pub confirm_code: String,
    pub driver_name: Option<String>,
    pub load_type: LoadType,
}

impl From<JoinBody> for JoinFields {
    fn from(body: JoinBody) -> Self {
        JoinFields {
            po_number: body.po_number,
            confirm_code: body.confirm_code,
            driver_name: body.driver_name,
            load_type: body.load_type,
        }
    }
}

/// Request body for rejecting a pending request.
#[derive(Debug, Deserialize)]
pub struct RejectBody {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListRequestsResponse {
    pub requests: Vec<PendingRequest>,
}

/// Submit a join request for admin review.
pub async fn submit_request(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    Json(body): Json<JoinBody>,
) -> Result<(StatusCode, Json<PendingRequest>), (StatusCode, Json<ApiError>)> {
    let request = state
        .queue()
        .submit_request(body.into(), &identity)
        .await
        .map_err(error_response)?;

    state.ws_broadcaster().requests_changed();
    Ok((StatusCode::CREATED, Json(request)))
}

/// List requests awaiting review.
pub async fn list_requests(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListRequestsResponse>, (StatusCode, Json<ApiError>)> {
    let requests = state.queue().list_pending().map_err(error_response)?;
    Ok(Json(ListRequestsResponse { requests }))
}

/// Approve a pending request, entering the truck into the queue.
pub async fn approve_request(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, (StatusCode, Json<ApiError>)> {
    let ticket = state
        .queue()
        .approve_request(&id, &identity)
        .await
        .map_err(error_response)?;

    state.ws_broadcaster().requests_changed();
    state.ws_broadcaster().queue_changed();
    Ok(Json(ticket))
}

/// Reject a pending request.
pub async fn reject_request(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    Json(body): Json<RejectBody>,
) -> Result<Json<PendingRequest>, (StatusCode, Json<ApiError>)> {
    let request = state
        .queue()
        .reject_request(&id, body.reason, &identity)
        .await
        .map_err(error_response)?;

    state.ws_broadcaster().requests_changed();
    Ok(Json(request))
}
