use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::ActivityEvent;

/// Envelope wrapping an activity event with metadata
#[derive(Debug, Clone)]
pub struct ActivityEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: ActivityEvent,
}

/// Handle for emitting activity events
///
/// This is cheaply cloneable and can be shared across tasks.
/// Events are sent through an async channel to be written by the ActivityWriter.
#[derive(Clone)]
pub struct ActivityHandle {
    tx: mpsc::Sender<ActivityEnvelope>,
}

impl ActivityHandle {
    /// Create a new activity handle from a channel sender
    pub fn new(tx: mpsc::Sender<ActivityEnvelope>) -> Self {
        Self { tx }
    }

    /// Emit an activity event asynchronously
    ///
    /// This is non-blocking. If the channel is full or closed, the error is logged
    /// but the caller is not blocked or failed.
    pub async fn emit(&self, event: ActivityEvent) {
        let envelope = ActivityEnvelope {
            timestamp: Utc::now(),
            event,
        };
        if let Err(e) = self.tx.send(envelope).await {
            tracing::error!("Failed to emit activity event: {}", e);
        }
    }

    /// Emit an activity event synchronously (blocking)
    ///
    /// Use this in contexts where async isn't available.
    pub fn emit_blocking(&self, event: ActivityEvent) {
        let envelope = ActivityEnvelope {
            timestamp: Utc::now(),
            event,
        };
        if let Err(e) = self.tx.blocking_send(envelope) {
            tracing::error!("Failed to emit activity event: {}", e);
        }
    }

    /// Try to emit an activity event without blocking
    ///
    /// Returns true if the event was sent successfully, false otherwise.
    pub fn try_emit(&self, event: ActivityEvent) -> bool {
        let envelope = ActivityEnvelope {
            timestamp: Utc::now(),
            event,
        };
        match self.tx.try_send(envelope) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to emit activity event: {}", e);
                false
            }
        }
    }
}
