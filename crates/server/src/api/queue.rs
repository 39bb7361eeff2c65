//! Queue and ticket API handlers: board snapshot, stage transitions,
//! removal, reorder, PO validation, zones and driver lookup.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use gatehouse_core::queue::{PoLookup, QueueEntry, Zone};
use gatehouse_core::ticket::{Stage, Ticket, TicketFilter};

use crate::api::middleware::Caller;
use crate::api::requests::JoinBody;
use crate::api::{error_response, ApiError};
use crate::state::AppState;

/// Maximum allowed limit for ticket queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for ticket queries
const DEFAULT_LIMIT: i64 = 100;

/// Query parameters for listing tickets
#[derive(Debug, Deserialize)]
pub struct ListTicketsParams {
    /// Filter by stage
    pub stage: Option<Stage>,
    /// Filter by PO number
    pub po_number: Option<String>,
    /// Maximum number of tickets to return
    pub limit: Option<i64>,
    /// Pagination offset
    pub offset: Option<i64>,
}

/// Request body for a stage transition
#[derive(Debug, Deserialize)]
pub struct TransitionBody {
    pub stage: Stage,
}

/// Request body for removing a ticket
#[derive(Debug, Deserialize)]
pub struct RemoveBody {
    pub reason: Option<String>,
}

/// Request body for moving a ticket within the queue
#[derive(Debug, Deserialize)]
pub struct ReorderBody {
    /// 0-based target index in the active queue
    pub new_index: usize,
}

/// Request body for recording a PO validation verdict
#[derive(Debug, Deserialize)]
pub struct PoValidationBody {
    pub valid: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub queue: Vec<QueueEntry>,
}

#[derive(Debug, Serialize)]
pub struct ListTicketsResponse {
    pub tickets: Vec<Ticket>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct ZonesResponse {
    pub zones: Vec<Zone>,
}

/// The active queue in position order, with wait estimates.
pub async fn get_queue(
    State(state): State<Arc<AppState>>,
) -> Result<Json<QueueResponse>, (StatusCode, Json<ApiError>)> {
    let queue = state.queue().queue_snapshot().map_err(error_response)?;
    Ok(Json(QueueResponse { queue }))
}

/// Create a ticket directly, bypassing the request flow.
pub async fn create_manual_ticket(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    Json(body): Json<JoinBody>,
) -> Result<(StatusCode, Json<Ticket>), (StatusCode, Json<ApiError>)> {
    let ticket = state
        .queue()
        .create_manual_ticket(body.into(), &identity)
        .await
        .map_err(error_response)?;

    state.ws_broadcaster().queue_changed();
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// List tickets with optional filters, newest first.
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTicketsParams>,
) -> Result<Json<ListTicketsResponse>, (StatusCode, Json<ApiError>)> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = TicketFilter::new().with_limit(limit).with_offset(offset);
    if let Some(stage) = params.stage {
        filter = filter.with_stage(stage);
    }
    if let Some(ref po_number) = params.po_number {
        filter = filter.with_po_number(po_number);
    }

    let tickets = state.queue().list_tickets(&filter).map_err(error_response)?;
    Ok(Json(ListTicketsResponse {
        tickets,
        limit,
        offset,
    }))
}

/// Get a ticket by ID.
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, (StatusCode, Json<ApiError>)> {
    let ticket = state.queue().get_ticket(&id).map_err(error_response)?;
    Ok(Json(ticket))
}

/// Move a ticket to another stage.
pub async fn transition_stage(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    Json(body): Json<TransitionBody>,
) -> Result<Json<Ticket>, (StatusCode, Json<ApiError>)> {
    let ticket = state
        .queue()
        .transition_stage(&id, body.stage, &identity)
        .await
        .map_err(error_response)?;

    state
        .ws_broadcaster()
        .ticket_updated(&ticket.id, ticket.stage.as_str());
    state.ws_broadcaster().queue_changed();
    Ok(Json(ticket))
}

/// Remove a ticket from the system entirely.
pub async fn remove_ticket(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    body: Option<Json<RemoveBody>>,
) -> Result<Json<Ticket>, (StatusCode, Json<ApiError>)> {
    let reason = body.and_then(|Json(b)| b.reason);
    let ticket = state
        .queue()
        .remove_ticket(&id, reason, &identity)
        .await
        .map_err(error_response)?;

    state.ws_broadcaster().ticket_removed(&ticket.id);
    state.ws_broadcaster().queue_changed();
    Ok(Json(ticket))
}

/// Move one ticket to a new index in the active queue.
pub async fn reorder_queue(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    Json(body): Json<ReorderBody>,
) -> Result<Json<QueueResponse>, (StatusCode, Json<ApiError>)> {
    state
        .queue()
        .reorder_queue(&id, body.new_index, &identity)
        .await
        .map_err(error_response)?;

    state.ws_broadcaster().queue_changed();
    let queue = state.queue().queue_snapshot().map_err(error_response)?;
    Ok(Json(QueueResponse { queue }))
}

/// Record a back-office PO validation verdict.
pub async fn validate_po(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    Json(body): Json<PoValidationBody>,
) -> Result<Json<Ticket>, (StatusCode, Json<ApiError>)> {
    let ticket = state
        .queue()
        .validate_po(&id, body.valid, body.reason.as_deref(), &identity)
        .await
        .map_err(error_response)?;

    state
        .ws_broadcaster()
        .ticket_updated(&ticket.id, ticket.stage.as_str());
    Ok(Json(ticket))
}

/// Current staging zone statuses.
pub async fn get_zones(State(state): State<Arc<AppState>>) -> Json<ZonesResponse> {
    let zones = state.queue().zones_snapshot().await;
    Json(ZonesResponse { zones })
}

/// Record that the summoned truck is physically in its zone.
pub async fn mark_arrived(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    Path(zone_id): Path<u32>,
) -> Result<Json<Zone>, (StatusCode, Json<ApiError>)> {
    let zone = state
        .queue()
        .mark_arrived(zone_id, &identity)
        .await
        .map_err(error_response)?;

    state
        .ws_broadcaster()
        .zone_updated(zone.id, zone.status.as_str());
    Ok(Json(zone))
}

/// What the driver holding this PO number currently has in the system.
pub async fn lookup_po(
    State(state): State<Arc<AppState>>,
    Path(po_number): Path<String>,
) -> Result<Json<PoLookup>, (StatusCode, Json<ApiError>)> {
    let lookup = state.queue().lookup_po(&po_number).map_err(error_response)?;
    Ok(Json(lookup))
}
