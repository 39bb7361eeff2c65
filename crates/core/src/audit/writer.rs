use std::sync::Arc;

use tokio::sync::mpsc;

use super::{ActivityEnvelope, ActivityHandle, ActivityRecord, ActivityStore};

/// Background task that receives activity events and writes them to storage
pub struct ActivityWriter {
    rx: mpsc::Receiver<ActivityEnvelope>,
    store: Arc<dyn ActivityStore>,
}

impl ActivityWriter {
    /// Create a new activity writer
    pub fn new(rx: mpsc::Receiver<ActivityEnvelope>, store: Arc<dyn ActivityStore>) -> Self {
        Self { rx, store }
    }

    /// Run the writer, consuming events until the channel is closed
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        tracing::info!("Activity writer started");

        while let Some(envelope) = self.rx.recv().await {
            let record = ActivityRecord {
                id: 0, // Will be set by database
                timestamp: envelope.timestamp,
                event_type: envelope.event.event_type().to_string(),
                po_number: envelope.event.po_number().map(String::from),
                user_id: envelope.event.user_id().map(String::from),
                data: envelope.event,
            };

            if let Err(e) = self.store.insert(&record) {
                tracing::error!("Failed to write activity event: {}", e);
            }
        }

        tracing::info!("Activity writer shutting down");
    }
}

/// Create a complete activity logging system
///
/// Returns:
/// - `ActivityHandle` - for emitting events (clone this to share across tasks)
/// - `ActivityWriter` - spawn this as a background task with `tokio::spawn(writer.run())`
pub fn create_activity_system(
    store: Arc<dyn ActivityStore>,
    buffer_size: usize,
) -> (ActivityHandle, ActivityWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    let handle = ActivityHandle::new(tx);
    let writer = ActivityWriter::new(rx, store);
    (handle, writer)
}
