//! Prometheus metrics for queue components.

use once_cell::sync::Lazy;
use prometheus::{IntCounterVec, IntGauge, Opts};

/// Current number of position-bearing tickets in the queue.
pub static QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "gatehouse_queue_depth",
        "Number of tickets currently holding a queue position",
    )
    .unwrap()
});

/// Currently bound staging zones (pending or occupied).
pub static ZONES_IN_USE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "gatehouse_zones_in_use",
        "Number of staging zones currently bound to a ticket",
    )
    .unwrap()
});

/// Stage transitions total by destination stage.
pub static STAGE_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "gatehouse_stage_transitions_total",
            "Total ticket stage transitions",
        ),
        &["to_stage"],
    )
    .unwrap()
});

/// Join request outcomes total.
pub static REQUEST_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "gatehouse_request_outcomes_total",
            "Total join request outcomes",
        ),
        &["outcome"], // "submitted", "approved", "rejected"
    )
    .unwrap()
});

/// Summons refused because no staging zone was free.
pub static SUMMON_REFUSALS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "gatehouse_summon_refusals_total",
            "Total summons refused for lack of zone capacity",
        ),
        &[],
    )
    .unwrap()
});

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(QUEUE_DEPTH.clone()),
        Box::new(ZONES_IN_USE.clone()),
        Box::new(STAGE_TRANSITIONS.clone()),
        Box::new(REQUEST_OUTCOMES.clone()),
        Box::new(SUMMON_REFUSALS.clone()),
    ]
}
