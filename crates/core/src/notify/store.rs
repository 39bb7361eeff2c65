use std::sync::Arc;

use thiserror::Error;

use super::{NotificationIntent, NotificationKind};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Database error: {0}")]
    Database(String),
}

/// Trait for notification intent storage
pub trait NotificationStore: Send + Sync {
    /// Record a new intent, returns it with the assigned ID
    fn record(
        &self,
        po_number: &str,
        kind: NotificationKind,
        message: &str,
    ) -> Result<NotificationIntent, NotifyError>;

    /// List intents for a PO number, newest first
    fn list_by_po(&self, po_number: &str, limit: i64) -> Result<Vec<NotificationIntent>, NotifyError>;
}

/// Best-effort emitter over a notification store.
///
/// Queue operations must not fail because a notification could not be
/// recorded, so failures are logged and swallowed here.
#[derive(Clone)]
pub struct Notifier {
    store: Arc<dyn NotificationStore>,
}

impl Notifier {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    pub fn emit(&self, po_number: &str, kind: NotificationKind, message: &str) {
        if let Err(e) = self.store.record(po_number, kind, message) {
            tracing::warn!(po_number, "Failed to record notification: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct FailingStore;

    impl NotificationStore for FailingStore {
        fn record(
            &self,
            _po_number: &str,
            _kind: NotificationKind,
            _message: &str,
        ) -> Result<NotificationIntent, NotifyError> {
            Err(NotifyError::Database("down".to_string()))
        }

        fn list_by_po(
            &self,
            _po_number: &str,
            _limit: i64,
        ) -> Result<Vec<NotificationIntent>, NotifyError> {
            Ok(Vec::new())
        }
    }

    struct RecordingStore {
        messages: Mutex<Vec<String>>,
    }

    impl NotificationStore for RecordingStore {
        fn record(
            &self,
            po_number: &str,
            kind: NotificationKind,
            message: &str,
        ) -> Result<NotificationIntent, NotifyError> {
            self.messages.lock().unwrap().push(message.to_string());
            Ok(NotificationIntent {
                id: 1,
                po_number: po_number.to_string(),
                kind,
                message: message.to_string(),
                created_at: chrono::Utc::now(),
            })
        }

        fn list_by_po(
            &self,
            _po_number: &str,
            _limit: i64,
        ) -> Result<Vec<NotificationIntent>, NotifyError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_emit_swallows_store_failure() {
        let notifier = Notifier::new(Arc::new(FailingStore));
        // Must not panic
        notifier.emit("1234567", NotificationKind::Success, "hello");
    }

    #[test]
    fn test_emit_records_message() {
        let store = Arc::new(RecordingStore {
            messages: Mutex::new(Vec::new()),
        });
        let notifier = Notifier::new(Arc::clone(&store) as Arc<dyn NotificationStore>);

        notifier.emit("1234567", NotificationKind::StatusUpdate, "on the way");

        assert_eq!(
            store.messages.lock().unwrap().as_slice(),
            &["on the way".to_string()]
        );
    }
}
