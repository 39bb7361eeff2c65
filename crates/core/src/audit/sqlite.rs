use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{ActivityEvent, ActivityFilter, ActivityRecord, ActivityStore, AuditError};

/// SQLite-backed activity log store
pub struct SqliteActivityStore {
    conn: Mutex<Connection>,
}

impl SqliteActivityStore {
    /// Create a new SQLite activity store, creating the database file and tables if needed
    pub fn new(path: &Path) -> Result<Self, AuditError> {
        let conn = Connection::open(path).map_err(|e| AuditError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite activity store (useful for testing)
    pub fn in_memory() -> Result<Self, AuditError> {
        let conn = Connection::open_in_memory().map_err(|e| AuditError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), AuditError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS activity_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_type TEXT NOT NULL,
                po_number TEXT,
                user_id TEXT,
                data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_activity_log_timestamp ON activity_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_activity_log_po_number ON activity_log(po_number);
            CREATE INDEX IF NOT EXISTS idx_activity_log_event_type ON activity_log(event_type);
            CREATE INDEX IF NOT EXISTS idx_activity_log_user_id ON activity_log(user_id);
            "#,
        )
        .map_err(|e| AuditError::Database(e.to_string()))?;

        Ok(())
    }

    fn build_where_clause(filter: &ActivityFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref po_number) = filter.po_number {
            conditions.push("po_number = ?");
            params.push(Box::new(po_number.clone()));
        }

        if let Some(ref event_type) = filter.event_type {
            conditions.push("event_type = ?");
            params.push(Box::new(event_type.clone()));
        }

        if let Some(ref user_id) = filter.user_id {
            conditions.push("user_id = ?");
            params.push(Box::new(user_id.clone()));
        }

        if let Some(ref from) = filter.from {
            conditions.push("timestamp >= ?");
            params.push(Box::new(from.to_rfc3339()));
        }

        if let Some(ref to) = filter.to {
            conditions.push("timestamp <= ?");
            params.push(Box::new(to.to_rfc3339()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }
}

impl ActivityStore for SqliteActivityStore {
    fn insert(&self, record: &ActivityRecord) -> Result<i64, AuditError> {
        let conn = self.conn.lock().unwrap();

        let data_json = serde_json::to_string(&record.data)
            .map_err(|e| AuditError::Serialization(e.to_string()))?;

        conn.execute(
            "INSERT INTO activity_log (timestamp, event_type, po_number, user_id, data) VALUES (?, ?, ?, ?, ?)",
            params![
                record.timestamp.to_rfc3339(),
                record.event_type,
                record.po_number,
                record.user_id,
                data_json,
            ],
        )
        .map_err(|e| AuditError::Database(e.to_string()))?;

        Ok(conn.last_insert_rowid())
    }

    fn query(&self, filter: &ActivityFilter) -> Result<Vec<ActivityRecord>, AuditError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT id, timestamp, event_type, po_number, user_id, data FROM activity_log {} ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
            where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| AuditError::Database(e.to_string()))?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                let id: i64 = row.get(0)?;
                let timestamp_str: String = row.get(1)?;
                let event_type: String = row.get(2)?;
                let po_number: Option<String> = row.get(3)?;
                let user_id: Option<String> = row.get(4)?;
                let data_json: String = row.get(5)?;

                Ok((id, timestamp_str, event_type, po_number, user_id, data_json))
            })
            .map_err(|e| AuditError::Database(e.to_string()))?;

        let mut records = Vec::new();
        for row_result in rows {
            let (id, timestamp_str, event_type, po_number, user_id, data_json) =
                row_result.map_err(|e| AuditError::Database(e.to_string()))?;

            let timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(&timestamp_str)
                .map_err(|e| AuditError::Database(format!("Invalid timestamp: {}", e)))?
                .into();

            let data: ActivityEvent = serde_json::from_str(&data_json)
                .map_err(|e| AuditError::Serialization(e.to_string()))?;

            records.push(ActivityRecord {
                id,
                timestamp,
                event_type,
                po_number,
                user_id,
                data,
            });
        }

        Ok(records)
    }

    fn count(&self, filter: &ActivityFilter) -> Result<i64, AuditError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!("SELECT COUNT(*) FROM activity_log {}", where_clause);

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| AuditError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(event: ActivityEvent) -> ActivityRecord {
        ActivityRecord {
            id: 0,
            timestamp: Utc::now(),
            event_type: event.event_type().to_string(),
            po_number: event.po_number().map(String::from),
            user_id: event.user_id().map(String::from),
            data: event,
        }
    }

    fn stage_changed(po: &str, by: &str) -> ActivityEvent {
        ActivityEvent::StageChanged {
            ticket_id: "t-1".to_string(),
            po_number: po.to_string(),
            from_stage: "queued".to_string(),
            to_stage: "summoned".to_string(),
            changed_by: by.to_string(),
        }
    }

    #[test]
    fn test_insert_and_query() {
        let store = SqliteActivityStore::in_memory().unwrap();

        let id = store.insert(&record(stage_changed("1234567", "admin"))).unwrap();
        assert!(id > 0);

        let records = store.query(&ActivityFilter::new()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_type, "stage_changed");
        assert_eq!(records[0].po_number.as_deref(), Some("1234567"));
        assert_eq!(records[0].user_id.as_deref(), Some("admin"));
    }

    #[test]
    fn test_filter_by_po_number() {
        let store = SqliteActivityStore::in_memory().unwrap();
        store.insert(&record(stage_changed("1111111", "admin"))).unwrap();
        store.insert(&record(stage_changed("2222222", "admin"))).unwrap();

        let records = store
            .query(&ActivityFilter::new().with_po_number("1111111"))
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].po_number.as_deref(), Some("1111111"));
    }

    #[test]
    fn test_filter_by_event_type_and_user() {
        let store = SqliteActivityStore::in_memory().unwrap();
        store.insert(&record(stage_changed("1234567", "alice"))).unwrap();
        store
            .insert(&record(ActivityEvent::TicketRemoved {
                ticket_id: "t-1".to_string(),
                po_number: "1234567".to_string(),
                removed_by: "bob".to_string(),
                reason: None,
            }))
            .unwrap();

        let removed = store
            .query(&ActivityFilter::new().with_event_type("ticket_removed"))
            .unwrap();
        assert_eq!(removed.len(), 1);

        let by_alice = store
            .query(&ActivityFilter::new().with_user_id("alice"))
            .unwrap();
        assert_eq!(by_alice.len(), 1);
        assert_eq!(by_alice[0].event_type, "stage_changed");
    }

    #[test]
    fn test_query_newest_first() {
        let store = SqliteActivityStore::in_memory().unwrap();
        store.insert(&record(stage_changed("1111111", "admin"))).unwrap();
        store.insert(&record(stage_changed("2222222", "admin"))).unwrap();

        let records = store.query(&ActivityFilter::new()).unwrap();
        assert_eq!(records[0].po_number.as_deref(), Some("2222222"));
    }

    #[test]
    fn test_count() {
        let store = SqliteActivityStore::in_memory().unwrap();
        for _ in 0..3 {
            store.insert(&record(stage_changed("1234567", "admin"))).unwrap();
        }

        assert_eq!(store.count(&ActivityFilter::new()).unwrap(), 3);
        assert_eq!(
            store
                .count(&ActivityFilter::new().with_po_number("9999999"))
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_limit_and_offset() {
        let store = SqliteActivityStore::in_memory().unwrap();
        for i in 0..5 {
            store
                .insert(&record(stage_changed(&format!("111111{}", i), "admin")))
                .unwrap();
        }

        let page = store
            .query(&ActivityFilter::new().with_limit(2).with_offset(2))
            .unwrap();
        assert_eq!(page.len(), 2);
    }

    #[test]
    fn test_data_round_trips_event_payload() {
        let store = SqliteActivityStore::in_memory().unwrap();
        store
            .insert(&record(ActivityEvent::RequestApproved {
                request_id: "r-1".to_string(),
                ticket_id: "t-1".to_string(),
                po_number: "1234567".to_string(),
                position: 3,
                approved_by: "admin".to_string(),
            }))
            .unwrap();

        let records = store.query(&ActivityFilter::new()).unwrap();
        assert!(matches!(
            records[0].data,
            ActivityEvent::RequestApproved { position: 3, .. }
        ));
    }
}
