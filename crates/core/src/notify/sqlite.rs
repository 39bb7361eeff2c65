use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{NotificationIntent, NotificationKind, NotificationStore, NotifyError};

/// SQLite-backed notification intent store
pub struct SqliteNotificationStore {
    conn: Mutex<Connection>,
}

impl SqliteNotificationStore {
    /// Create a new SQLite notification store, creating the database file and tables if needed
    pub fn new(path: &Path) -> Result<Self, NotifyError> {
        let conn = Connection::open(path).map_err(|e| NotifyError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite notification store (useful for testing)
    pub fn in_memory() -> Result<Self, NotifyError> {
        let conn =
            Connection::open_in_memory().map_err(|e| NotifyError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), NotifyError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                po_number TEXT NOT NULL,
                kind TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_notifications_po_number ON notifications(po_number);
            "#,
        )
        .map_err(|e| NotifyError::Database(e.to_string()))?;

        Ok(())
    }

    fn parse_kind(raw: &str) -> Result<NotificationKind, NotifyError> {
        match raw {
            "success" => Ok(NotificationKind::Success),
            "error" => Ok(NotificationKind::Error),
            "status_update" => Ok(NotificationKind::StatusUpdate),
            "admin_action" => Ok(NotificationKind::AdminAction),
            other => Err(NotifyError::Database(format!(
                "unknown notification kind: {}",
                other
            ))),
        }
    }
}

impl NotificationStore for SqliteNotificationStore {
    fn record(
        &self,
        po_number: &str,
        kind: NotificationKind,
        message: &str,
    ) -> Result<NotificationIntent, NotifyError> {
        let conn = self.conn.lock().unwrap();

        let now = Utc::now();
        conn.execute(
            "INSERT INTO notifications (po_number, kind, message, created_at) VALUES (?, ?, ?, ?)",
            params![po_number, kind.as_str(), message, now.to_rfc3339()],
        )
        .map_err(|e| NotifyError::Database(e.to_string()))?;

        Ok(NotificationIntent {
            id: conn.last_insert_rowid(),
            po_number: po_number.to_string(),
            kind,
            message: message.to_string(),
            created_at: now,
        })
    }

    fn list_by_po(
        &self,
        po_number: &str,
        limit: i64,
    ) -> Result<Vec<NotificationIntent>, NotifyError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT id, po_number, kind, message, created_at FROM notifications WHERE po_number = ? ORDER BY created_at DESC, id DESC LIMIT ?",
            )
            .map_err(|e| NotifyError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![po_number, limit], |row| {
                let id: i64 = row.get(0)?;
                let po_number: String = row.get(1)?;
                let kind_raw: String = row.get(2)?;
                let message: String = row.get(3)?;
                let created_at_raw: String = row.get(4)?;
                Ok((id, po_number, kind_raw, message, created_at_raw))
            })
            .map_err(|e| NotifyError::Database(e.to_string()))?;

        let mut intents = Vec::new();
        for row_result in rows {
            let (id, po_number, kind_raw, message, created_at_raw) =
                row_result.map_err(|e| NotifyError::Database(e.to_string()))?;

            let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_at_raw)
                .map_err(|e| NotifyError::Database(format!("Invalid timestamp: {}", e)))?
                .into();

            intents.push(NotificationIntent {
                id,
                po_number,
                kind: Self::parse_kind(&kind_raw)?,
                message,
                created_at,
            });
        }

        Ok(intents)
    }
}
