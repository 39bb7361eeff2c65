use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Activity log event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Join request lifecycle
    RequestSubmitted {
        request_id: String,
        po_number: String,
        submitted_by: String,
    },
    RequestApproved {
        request_id: String,
        ticket_id: String,
        po_number: String,
        position: u32,
        approved_by: String,
    },
    RequestRejected {
        request_id: String,
        po_number: String,
        rejected_by: String,
        reason: Option<String>,
    },
    /// Admin created a ticket directly, bypassing the request flow.
    ManualTicketCreated {
        ticket_id: String,
        po_number: String,
        position: u32,
        created_by: String,
    },

    // Ticket lifecycle
    StageChanged {
        ticket_id: String,
        po_number: String,
        from_stage: String,
        to_stage: String,
        changed_by: String,
    },
    TicketRemoved {
        ticket_id: String,
        po_number: String,
        removed_by: String,
        reason: Option<String>,
    },
    QueueReordered {
        ticket_id: String,
        po_number: String,
        from_position: u32,
        to_position: u32,
        reordered_by: String,
    },
    PoValidationSet {
        ticket_id: String,
        po_number: String,
        valid: bool,
        reason: Option<String>,
        validated_by: String,
    },

    // Staging zone events
    ZoneAssigned {
        zone_id: u32,
        ticket_id: String,
        po_number: String,
    },
    ZoneOccupied {
        zone_id: u32,
        ticket_id: String,
        po_number: String,
        marked_by: String,
    },
    ZoneReleased {
        zone_id: u32,
        ticket_id: String,
        po_number: String,
    },
}

impl ActivityEvent {
    /// Get the event type as a string for indexing
    pub fn event_type(&self) -> &'static str {
        match self {
            ActivityEvent::ServiceStarted { .. } => "service_started",
            ActivityEvent::ServiceStopped { .. } => "service_stopped",
            ActivityEvent::RequestSubmitted { .. } => "request_submitted",
            ActivityEvent::RequestApproved { .. } => "request_approved",
            ActivityEvent::RequestRejected { .. } => "request_rejected",
            ActivityEvent::ManualTicketCreated { .. } => "manual_ticket_created",
            ActivityEvent::StageChanged { .. } => "stage_changed",
            ActivityEvent::TicketRemoved { .. } => "ticket_removed",
            ActivityEvent::QueueReordered { .. } => "queue_reordered",
            ActivityEvent::PoValidationSet { .. } => "po_validation_set",
            ActivityEvent::ZoneAssigned { .. } => "zone_assigned",
            ActivityEvent::ZoneOccupied { .. } => "zone_occupied",
            ActivityEvent::ZoneReleased { .. } => "zone_released",
        }
    }

    /// Extract the PO number if this event relates to one
    pub fn po_number(&self) -> Option<&str> {
        match self {
            ActivityEvent::ServiceStarted { .. } | ActivityEvent::ServiceStopped { .. } => None,
            ActivityEvent::RequestSubmitted { po_number, .. }
            | ActivityEvent::RequestApproved { po_number, .. }
            | ActivityEvent::RequestRejected { po_number, .. }
            | ActivityEvent::ManualTicketCreated { po_number, .. }
            | ActivityEvent::StageChanged { po_number, .. }
            | ActivityEvent::TicketRemoved { po_number, .. }
            | ActivityEvent::QueueReordered { po_number, .. }
            | ActivityEvent::PoValidationSet { po_number, .. }
            | ActivityEvent::ZoneAssigned { po_number, .. }
            | ActivityEvent::ZoneOccupied { po_number, .. }
            | ActivityEvent::ZoneReleased { po_number, .. } => Some(po_number),
        }
    }

    /// Extract the acting user if this event has one
    pub fn user_id(&self) -> Option<&str> {
        match self {
            ActivityEvent::RequestSubmitted { submitted_by, .. } => Some(submitted_by),
            ActivityEvent::RequestApproved { approved_by, .. } => Some(approved_by),
            ActivityEvent::RequestRejected { rejected_by, .. } => Some(rejected_by),
            ActivityEvent::ManualTicketCreated { created_by, .. } => Some(created_by),
            ActivityEvent::StageChanged { changed_by, .. } => Some(changed_by),
            ActivityEvent::TicketRemoved { removed_by, .. } => Some(removed_by),
            ActivityEvent::QueueReordered { reordered_by, .. } => Some(reordered_by),
            ActivityEvent::PoValidationSet { validated_by, .. } => Some(validated_by),
            ActivityEvent::ZoneOccupied { marked_by, .. } => Some(marked_by),
            ActivityEvent::ServiceStarted { .. }
            | ActivityEvent::ServiceStopped { .. }
            | ActivityEvent::ZoneAssigned { .. }
            | ActivityEvent::ZoneReleased { .. } => None,
        }
    }
}

/// An activity log entry as stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub po_number: Option<String>,
    pub user_id: Option<String>,
    pub data: ActivityEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_strings() {
        let event = ActivityEvent::StageChanged {
            ticket_id: "t-1".to_string(),
            po_number: "1234567".to_string(),
            from_stage: "queued".to_string(),
            to_stage: "summoned".to_string(),
            changed_by: "admin".to_string(),
        };
        assert_eq!(event.event_type(), "stage_changed");
    }

    #[test]
    fn test_po_number_extraction() {
        let event = ActivityEvent::RequestSubmitted {
            request_id: "r-1".to_string(),
            po_number: "1234567".to_string(),
            submitted_by: "driver".to_string(),
        };
        assert_eq!(event.po_number(), Some("1234567"));

        let event = ActivityEvent::ServiceStopped {
            reason: "shutdown".to_string(),
        };
        assert_eq!(event.po_number(), None);
    }

    #[test]
    fn test_user_id_extraction() {
        let event = ActivityEvent::TicketRemoved {
            ticket_id: "t-1".to_string(),
            po_number: "1234567".to_string(),
            removed_by: "admin".to_string(),
            reason: Some("no-show".to_string()),
        };
        assert_eq!(event.user_id(), Some("admin"));

        let event = ActivityEvent::ZoneAssigned {
            zone_id: 1,
            ticket_id: "t-1".to_string(),
            po_number: "1234567".to_string(),
        };
        assert_eq!(event.user_id(), None);
    }

    #[test]
    fn test_serde_tagging() {
        let event = ActivityEvent::ZoneOccupied {
            zone_id: 2,
            ticket_id: "t-1".to_string(),
            po_number: "1234567".to_string(),
            marked_by: "admin".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"zone_occupied\""));

        let back: ActivityEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, ActivityEvent::ZoneOccupied { zone_id: 2, .. }));
    }
}
