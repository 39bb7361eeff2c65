//! SQLite-backed queue store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{
    JoinFields, LoadType, NewTicket, PendingRequest, QueueStore, Stage, StoreError, Ticket,
    TicketFilter,
};

const TICKET_COLUMNS: &str = "id, po_number, confirm_code, driver_name, load_type, stage, \
     position, po_validated, po_validation_reason, requested_at, joined_at, created_by, updated_at";

/// SQLite-backed queue store.
pub struct SqliteQueueStore {
    conn: Mutex<Connection>,
}

impl SqliteQueueStore {
    /// Create a new SQLite queue store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite queue store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tickets (
                id TEXT PRIMARY KEY,
                po_number TEXT NOT NULL,
                confirm_code TEXT NOT NULL,
                driver_name TEXT,
                load_type TEXT NOT NULL,
                stage TEXT NOT NULL,
                position INTEGER,
                po_validated INTEGER,
                po_validation_reason TEXT,
                requested_at TEXT NOT NULL,
                joined_at TEXT NOT NULL,
                created_by TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tickets_stage ON tickets(stage);
            CREATE INDEX IF NOT EXISTS idx_tickets_po_number ON tickets(po_number);

            CREATE TABLE IF NOT EXISTS pending_requests (
                id TEXT PRIMARY KEY,
                po_number TEXT NOT NULL,
                confirm_code TEXT NOT NULL,
                driver_name TEXT,
                load_type TEXT NOT NULL,
                requested_at TEXT NOT NULL,
                submitted_by TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_pending_requests_po_number
                ON pending_requests(po_number);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    /// Parse a stored timestamp, rejecting malformed rows instead of
    /// papering over them with defaults.
    fn parse_timestamp(col: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    col,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
    }

    fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
        let id: String = row.get(0)?;
        let po_number: String = row.get(1)?;
        let confirm_code: String = row.get(2)?;
        let driver_name: Option<String> = row.get(3)?;
        let load_type_raw: String = row.get(4)?;
        let stage_raw: String = row.get(5)?;
        let position: Option<u32> = row.get(6)?;
        let po_validated: Option<bool> = row.get(7)?;
        let po_validation_reason: Option<String> = row.get(8)?;
        let requested_at_raw: String = row.get(9)?;
        let joined_at_raw: String = row.get(10)?;
        let created_by: String = row.get(11)?;
        let updated_at_raw: String = row.get(12)?;

        let load_type: LoadType = load_type_raw.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let stage: Stage = stage_raw.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Ticket {
            id,
            po_number,
            confirm_code,
            driver_name,
            load_type,
            stage,
            position,
            po_validated,
            po_validation_reason,
            requested_at: Self::parse_timestamp(9, &requested_at_raw)?,
            joined_at: Self::parse_timestamp(10, &joined_at_raw)?,
            created_by,
            updated_at: Self::parse_timestamp(12, &updated_at_raw)?,
        })
    }

    fn row_to_pending(row: &rusqlite::Row) -> rusqlite::Result<PendingRequest> {
        let id: String = row.get(0)?;
        let po_number: String = row.get(1)?;
        let confirm_code: String = row.get(2)?;
        let driver_name: Option<String> = row.get(3)?;
        let load_type_raw: String = row.get(4)?;
        let requested_at_raw: String = row.get(5)?;
        let submitted_by: String = row.get(6)?;

        let load_type: LoadType = load_type_raw.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(PendingRequest {
            id,
            po_number,
            confirm_code,
            driver_name,
            load_type,
            requested_at: Self::parse_timestamp(5, &requested_at_raw)?,
            submitted_by,
        })
    }

    fn fetch_ticket(conn: &Connection, id: &str) -> Result<Ticket, StoreError> {
        let sql = format!("SELECT {} FROM tickets WHERE id = ?", TICKET_COLUMNS);
        match conn.query_row(&sql, params![id], Self::row_to_ticket) {
            Ok(ticket) => Ok(ticket),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::NotFound(id.to_string())),
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }
}

impl QueueStore for SqliteQueueStore {
    fn create_pending(
        &self,
        fields: JoinFields,
        submitted_by: &str,
    ) -> Result<PendingRequest, StoreError> {
        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO pending_requests (id, po_number, confirm_code, driver_name, load_type, requested_at, submitted_by) VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                fields.po_number,
                fields.confirm_code,
                fields.driver_name,
                fields.load_type.as_str(),
                now.to_rfc3339(),
                submitted_by,
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(PendingRequest {
            id,
            po_number: fields.po_number,
            confirm_code: fields.confirm_code,
            driver_name: fields.driver_name,
            load_type: fields.load_type,
            requested_at: now,
            submitted_by: submitted_by.to_string(),
        })
    }

    fn get_pending(&self, id: &str) -> Result<Option<PendingRequest>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            "SELECT id, po_number, confirm_code, driver_name, load_type, requested_at, submitted_by FROM pending_requests WHERE id = ?",
            params![id],
            Self::row_to_pending,
        );

        match result {
            Ok(request) => Ok(Some(request)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }

    fn list_pending(&self) -> Result<Vec<PendingRequest>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT id, po_number, confirm_code, driver_name, load_type, requested_at, submitted_by FROM pending_requests ORDER BY requested_at DESC",
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::row_to_pending)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut requests = Vec::new();
        for row in rows {
            requests.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }

        Ok(requests)
    }

    fn find_pending_by_po(&self, po_number: &str) -> Result<Option<PendingRequest>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            "SELECT id, po_number, confirm_code, driver_name, load_type, requested_at, submitted_by FROM pending_requests WHERE po_number = ? ORDER BY requested_at DESC LIMIT 1",
            params![po_number],
            Self::row_to_pending,
        );

        match result {
            Ok(request) => Ok(Some(request)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }

    fn delete_pending(&self, id: &str) -> Result<PendingRequest, StoreError> {
        let conn = self.conn.lock().unwrap();

        let request = match conn.query_row(
            "SELECT id, po_number, confirm_code, driver_name, load_type, requested_at, submitted_by FROM pending_requests WHERE id = ?",
            params![id],
            Self::row_to_pending,
        ) {
            Ok(request) => request,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(e) => return Err(StoreError::Database(e.to_string())),
        };

        conn.execute("DELETE FROM pending_requests WHERE id = ?", params![id])
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(request)
    }

    fn create_ticket(&self, new: NewTicket) -> Result<Ticket, StoreError> {
        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let stage = Stage::Queued;

        conn.execute(
            "INSERT INTO tickets (id, po_number, confirm_code, driver_name, load_type, stage, position, po_validated, po_validation_reason, requested_at, joined_at, created_by, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                new.fields.po_number,
                new.fields.confirm_code,
                new.fields.driver_name,
                new.fields.load_type.as_str(),
                stage.as_str(),
                new.position,
                new.po_validated,
                Option::<String>::None,
                new.requested_at.to_rfc3339(),
                now.to_rfc3339(),
                new.created_by,
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Ticket {
            id,
            po_number: new.fields.po_number,
            confirm_code: new.fields.confirm_code,
            driver_name: new.fields.driver_name,
            load_type: new.fields.load_type,
            stage,
            position: Some(new.position),
            po_validated: new.po_validated,
            po_validation_reason: None,
            requested_at: new.requested_at,
            joined_at: now,
            created_by: new.created_by,
            updated_at: now,
        })
    }

    fn get_ticket(&self, id: &str) -> Result<Option<Ticket>, StoreError> {
        let conn = self.conn.lock().unwrap();

        match Self::fetch_ticket(&conn, id) {
            Ok(ticket) => Ok(Some(ticket)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn find_active_by_po(&self, po_number: &str) -> Result<Option<Ticket>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT {} FROM tickets WHERE po_number = ? AND stage IN ('queued', 'summoned') LIMIT 1",
            TICKET_COLUMNS
        );

        match conn.query_row(&sql, params![po_number], Self::row_to_ticket) {
            Ok(ticket) => Ok(Some(ticket)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }

    fn list_active(&self) -> Result<Vec<Ticket>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT {} FROM tickets WHERE stage IN ('queued', 'summoned') ORDER BY position ASC",
            TICKET_COLUMNS
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::row_to_ticket)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut tickets = Vec::new();
        for row in rows {
            tickets.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }

        Ok(tickets)
    }

    fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut conditions = Vec::new();
        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(stage) = filter.stage {
            conditions.push("stage = ?");
            bound.push(Box::new(stage.as_str().to_string()));
        }

        if let Some(ref po_number) = filter.po_number {
            conditions.push("po_number = ?");
            bound.push(Box::new(po_number.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT {} FROM tickets {} ORDER BY joined_at ASC LIMIT ? OFFSET ?",
            TICKET_COLUMNS, where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        bound.push(Box::new(filter.limit));
        bound.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> = bound.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_ticket)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut tickets = Vec::new();
        for row in rows {
            tickets.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }

        Ok(tickets)
    }

    fn update_stage(
        &self,
        id: &str,
        stage: Stage,
        position: Option<u32>,
    ) -> Result<Ticket, StoreError> {
        let conn = self.conn.lock().unwrap();

        let current = Self::fetch_ticket(&conn, id)?;

        let now = Utc::now();
        conn.execute(
            "UPDATE tickets SET stage = ?, position = ?, updated_at = ? WHERE id = ?",
            params![stage.as_str(), position, now.to_rfc3339(), id],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Ticket {
            stage,
            position,
            updated_at: now,
            ..current
        })
    }

    fn set_po_validation(
        &self,
        id: &str,
        valid: bool,
        reason: Option<&str>,
    ) -> Result<Ticket, StoreError> {
        let conn = self.conn.lock().unwrap();

        let current = Self::fetch_ticket(&conn, id)?;

        let now = Utc::now();
        conn.execute(
            "UPDATE tickets SET po_validated = ?, po_validation_reason = ?, updated_at = ? WHERE id = ?",
            params![valid, reason, now.to_rfc3339(), id],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Ticket {
            po_validated: Some(valid),
            po_validation_reason: reason.map(String::from),
            updated_at: now,
            ..current
        })
    }

    fn apply_positions(&self, updates: &[(String, u32)]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();

        // Single transaction: either every position lands or none do.
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let now = Utc::now().to_rfc3339();
        for (id, position) in updates {
            let changed = tx
                .execute(
                    "UPDATE tickets SET position = ?, updated_at = ? WHERE id = ?",
                    params![position, now, id],
                )
                .map_err(|e| StoreError::Database(e.to_string()))?;

            if changed == 0 {
                // Dropping the transaction rolls everything back.
                return Err(StoreError::NotFound(id.clone()));
            }
        }

        tx.commit().map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    fn delete_ticket(&self, id: &str) -> Result<Ticket, StoreError> {
        let conn = self.conn.lock().unwrap();

        let ticket = Self::fetch_ticket(&conn, id)?;

        conn.execute("DELETE FROM tickets WHERE id = ?", params![id])
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteQueueStore {
        SqliteQueueStore::in_memory().unwrap()
    }

    fn join_fields(po: &str) -> JoinFields {
        JoinFields {
            po_number: po.to_string(),
            confirm_code: "5551234567".to_string(),
            driver_name: Some("Test Driver".to_string()),
            load_type: LoadType::Pickup,
        }
    }

    fn new_ticket(po: &str, position: u32) -> NewTicket {
        NewTicket {
            fields: join_fields(po),
            position,
            requested_at: Utc::now(),
            po_validated: None,
            created_by: "admin".to_string(),
        }
    }

    #[test]
    fn test_create_and_get_pending() {
        let store = create_test_store();
        let created = store.create_pending(join_fields("1234567"), "driver").unwrap();

        assert!(!created.id.is_empty());
        assert_eq!(created.po_number, "1234567");
        assert_eq!(created.submitted_by, "driver");

        let fetched = store.get_pending(&created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn test_get_nonexistent_pending() {
        let store = create_test_store();
        assert!(store.get_pending("missing").unwrap().is_none());
    }

    #[test]
    fn test_find_pending_by_po() {
        let store = create_test_store();
        store.create_pending(join_fields("1111111"), "driver").unwrap();
        store.create_pending(join_fields("2222222"), "driver").unwrap();

        let found = store.find_pending_by_po("2222222").unwrap().unwrap();
        assert_eq!(found.po_number, "2222222");
        assert!(store.find_pending_by_po("9999999").unwrap().is_none());
    }

    #[test]
    fn test_delete_pending() {
        let store = create_test_store();
        let created = store.create_pending(join_fields("1234567"), "driver").unwrap();

        let deleted = store.delete_pending(&created.id).unwrap();
        assert_eq!(deleted.id, created.id);
        assert!(store.get_pending(&created.id).unwrap().is_none());

        let missing = store.delete_pending(&created.id);
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_create_ticket_starts_queued() {
        let store = create_test_store();
        let ticket = store.create_ticket(new_ticket("1234567", 1)).unwrap();

        assert!(!ticket.id.is_empty());
        assert_eq!(ticket.stage, Stage::Queued);
        assert_eq!(ticket.position, Some(1));
        assert_eq!(ticket.po_validated, None);
    }

    #[test]
    fn test_list_active_ordered_by_position() {
        let store = create_test_store();
        store.create_ticket(new_ticket("1111111", 2)).unwrap();
        store.create_ticket(new_ticket("2222222", 1)).unwrap();
        store.create_ticket(new_ticket("3333333", 3)).unwrap();

        let active = store.list_active().unwrap();
        let positions: Vec<_> = active.iter().map(|t| t.position.unwrap()).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert_eq!(active[0].po_number, "2222222");
    }

    #[test]
    fn test_list_active_excludes_non_position_stages() {
        let store = create_test_store();
        let a = store.create_ticket(new_ticket("1111111", 1)).unwrap();
        store.create_ticket(new_ticket("2222222", 2)).unwrap();

        store.update_stage(&a.id, Stage::Loading, None).unwrap();

        let active = store.list_active().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].po_number, "2222222");
    }

    #[test]
    fn test_find_active_by_po() {
        let store = create_test_store();
        let a = store.create_ticket(new_ticket("1234567", 1)).unwrap();

        assert!(store.find_active_by_po("1234567").unwrap().is_some());

        store.update_stage(&a.id, Stage::Completed, None).unwrap();
        assert!(store.find_active_by_po("1234567").unwrap().is_none());
    }

    #[test]
    fn test_update_stage_not_found() {
        let store = create_test_store();
        let result = store.update_stage("missing", Stage::Summoned, Some(1));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_set_po_validation() {
        let store = create_test_store();
        let ticket = store.create_ticket(new_ticket("1234567", 1)).unwrap();

        let updated = store
            .set_po_validation(&ticket.id, false, Some("PO closed"))
            .unwrap();
        assert_eq!(updated.po_validated, Some(false));
        assert_eq!(updated.po_validation_reason.as_deref(), Some("PO closed"));

        let fetched = store.get_ticket(&ticket.id).unwrap().unwrap();
        assert_eq!(fetched.po_validated, Some(false));
    }

    #[test]
    fn test_apply_positions_batch() {
        let store = create_test_store();
        let a = store.create_ticket(new_ticket("1111111", 1)).unwrap();
        let b = store.create_ticket(new_ticket("2222222", 2)).unwrap();

        store
            .apply_positions(&[(a.id.clone(), 2), (b.id.clone(), 1)])
            .unwrap();

        let active = store.list_active().unwrap();
        assert_eq!(active[0].id, b.id);
        assert_eq!(active[1].id, a.id);
    }

    #[test]
    fn test_apply_positions_rolls_back_on_missing_id() {
        let store = create_test_store();
        let a = store.create_ticket(new_ticket("1111111", 1)).unwrap();

        let result = store.apply_positions(&[(a.id.clone(), 5), ("missing".to_string(), 1)]);
        assert!(matches!(result, Err(StoreError::NotFound(_))));

        // The first update must have been rolled back with the failed batch.
        let fetched = store.get_ticket(&a.id).unwrap().unwrap();
        assert_eq!(fetched.position, Some(1));
    }

    #[test]
    fn test_delete_ticket() {
        let store = create_test_store();
        let ticket = store.create_ticket(new_ticket("1234567", 1)).unwrap();

        let deleted = store.delete_ticket(&ticket.id).unwrap();
        assert_eq!(deleted.id, ticket.id);
        assert!(store.get_ticket(&ticket.id).unwrap().is_none());
    }

    #[test]
    fn test_list_tickets_with_stage_filter() {
        let store = create_test_store();
        let a = store.create_ticket(new_ticket("1111111", 1)).unwrap();
        store.create_ticket(new_ticket("2222222", 2)).unwrap();
        store.update_stage(&a.id, Stage::Completed, None).unwrap();

        let completed = store
            .list_tickets(&TicketFilter::new().with_stage(Stage::Completed))
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].po_number, "1111111");
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("queue.db");

        let store = SqliteQueueStore::new(&db_path).unwrap();
        let ticket = store.create_ticket(new_ticket("1234567", 1)).unwrap();

        assert!(db_path.exists());
        assert!(store.get_ticket(&ticket.id).unwrap().is_some());
    }
}
