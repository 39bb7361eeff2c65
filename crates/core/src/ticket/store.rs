//! Queue storage trait and supporting types.

use thiserror::Error;

use crate::ticket::{JoinFields, PendingRequest, Stage, Ticket};

/// Error type for queue store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Some but not all writes of a batch were applied. The ids name the
    /// records whose state on disk no longer matches what the caller
    /// intended. A transactional backend never returns this.
    #[error("partial write, inconsistent records: {0:?}")]
    PartialWrite(Vec<String>),

    /// Underlying database error.
    #[error("database error: {0}")]
    Database(String),
}

/// Filter for listing tickets.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    /// Filter by stage.
    pub stage: Option<Stage>,
    /// Filter by PO number.
    pub po_number: Option<String>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl TicketFilter {
    pub fn new() -> Self {
        Self {
            stage: None,
            po_number: None,
            limit: 100,
            offset: 0,
        }
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn with_po_number(mut self, po_number: impl Into<String>) -> Self {
        self.po_number = Some(po_number.into());
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Fields for creating a ticket in the queue.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub fields: JoinFields,
    /// Position assigned by the allocator before the ticket is written.
    pub position: u32,
    /// When the original join request was submitted.
    pub requested_at: chrono::DateTime<chrono::Utc>,
    /// PO validation verdict at creation (manual admin entries are
    /// pre-validated).
    pub po_validated: Option<bool>,
    pub created_by: String,
}

/// Trait for queue storage backends.
///
/// Implementations must make each method atomic on its own;
/// [`QueueStore::apply_positions`] in particular must apply the whole
/// batch or none of it wherever the backend supports transactions.
pub trait QueueStore: Send + Sync {
    /// Create a pending join request.
    fn create_pending(&self, fields: JoinFields, submitted_by: &str)
        -> Result<PendingRequest, StoreError>;

    /// Get a pending request by id.
    fn get_pending(&self, id: &str) -> Result<Option<PendingRequest>, StoreError>;

    /// List all pending requests, newest first.
    fn list_pending(&self) -> Result<Vec<PendingRequest>, StoreError>;

    /// Find a pending request by PO number.
    fn find_pending_by_po(&self, po_number: &str) -> Result<Option<PendingRequest>, StoreError>;

    /// Delete a pending request.
    fn delete_pending(&self, id: &str) -> Result<PendingRequest, StoreError>;

    /// Create a ticket, entering it in the queue.
    fn create_ticket(&self, new: NewTicket) -> Result<Ticket, StoreError>;

    /// Get a ticket by id.
    fn get_ticket(&self, id: &str) -> Result<Option<Ticket>, StoreError>;

    /// Find a ticket in a position-bearing stage by PO number.
    fn find_active_by_po(&self, po_number: &str) -> Result<Option<Ticket>, StoreError>;

    /// All tickets in position-bearing stages, ordered by position.
    fn list_active(&self) -> Result<Vec<Ticket>, StoreError>;

    /// List tickets matching the filter.
    fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, StoreError>;

    /// Update a ticket's stage and position in one write.
    fn update_stage(
        &self,
        id: &str,
        stage: Stage,
        position: Option<u32>,
    ) -> Result<Ticket, StoreError>;

    /// Set the back-office PO validation verdict.
    fn set_po_validation(
        &self,
        id: &str,
        valid: bool,
        reason: Option<&str>,
    ) -> Result<Ticket, StoreError>;

    /// Apply a batch of position updates atomically.
    fn apply_positions(&self, updates: &[(String, u32)]) -> Result<(), StoreError>;

    /// Permanently delete a ticket, returning it.
    fn delete_ticket(&self, id: &str) -> Result<Ticket, StoreError>;
}
