use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{activity, handlers, middleware, notifications, queue, requests, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Join requests
        .route("/requests", post(requests::submit_request))
        .route("/requests", get(requests::list_requests))
        .route("/requests/{id}/approve", post(requests::approve_request))
        .route("/requests/{id}/reject", post(requests::reject_request))
        // Queue board
        .route("/queue", get(queue::get_queue))
        .route("/queue/tickets", post(queue::create_manual_ticket))
        // Tickets
        .route("/tickets", get(queue::list_tickets))
        .route("/tickets/{id}", get(queue::get_ticket))
        .route("/tickets/{id}", delete(queue::remove_ticket))
        .route("/tickets/{id}/stage", post(queue::transition_stage))
        .route("/tickets/{id}/reorder", post(queue::reorder_queue))
        .route("/tickets/{id}/po-validation", post(queue::validate_po))
        // Staging zones
        .route("/zones", get(queue::get_zones))
        .route("/zones/{id}/arrived", post(queue::mark_arrived))
        // Driver-facing lookups
        .route("/lookup/{po_number}", get(queue::lookup_po))
        .route(
            "/notifications/{po_number}",
            get(notifications::list_notifications),
        )
        // Activity log
        .route("/activity", get(activity::query_activity))
        // Real-time updates
        .route("/ws", get(ws::ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .layer(axum_middleware::from_fn(middleware::metrics_middleware))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
