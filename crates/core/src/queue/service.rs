//! Queue orchestration.
//!
//! All mutating operations run under one tokio mutex guarding the zone
//! tracker. The store serializes individual writes on its own, but the
//! position sequence and zone bindings are multi-step reads and writes,
//! so the service re-reads queue state inside the critical section and
//! keeps the facility consistent by construction.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::audit::{ActivityEvent, ActivityHandle};
use crate::auth::Identity;
use crate::config::FacilityConfig;
use crate::metrics;
use crate::notify::{NotificationKind, Notifier};
use crate::ticket::{
    is_valid_confirm_code, is_valid_po_number, JoinFields, NewTicket, PendingRequest, QueueStore,
    Stage, Ticket, TicketFilter,
};

use super::{
    allocate_next_position, ensure_contiguous, renumber_after_removal, renumber_full, reorder,
    QueueError, Zone, ZoneTracker,
};

/// A ticket as shown on the queue board, with the driver's wait estimate.
#[derive(Debug, Clone, Serialize)]
pub struct QueueEntry {
    #[serde(flatten)]
    pub ticket: Ticket,
    /// Crude linear estimate: position times the per-truck constant.
    pub estimated_wait_minutes: Option<u32>,
}

/// What a driver looking up their PO number sees.
#[derive(Debug, Clone, Serialize)]
pub struct PoLookup {
    pub ticket: Option<QueueEntry>,
    pub pending: Option<PendingRequest>,
}

/// Facility check-in queue service.
pub struct QueueService {
    store: Arc<dyn QueueStore>,
    activity: ActivityHandle,
    notifier: Notifier,
    facility: FacilityConfig,
    zones: Mutex<ZoneTracker>,
}

impl QueueService {
    pub fn new(
        store: Arc<dyn QueueStore>,
        activity: ActivityHandle,
        notifier: Notifier,
        facility: FacilityConfig,
    ) -> Self {
        let zones = Mutex::new(ZoneTracker::new(facility.staging_zones));
        Self {
            store,
            activity,
            notifier,
            facility,
            zones,
        }
    }

    /// Rebuild zone bindings from stored tickets at startup.
    ///
    /// Summoned tickets without a zone get one in order of when they
    /// joined the queue; zones bound to tickets no longer summoned are
    /// freed.
    pub async fn recover(&self) -> Result<(), QueueError> {
        let mut zones = self.zones.lock().await;

        let active = self.store.list_active()?;
        let summoned: Vec<Ticket> = active
            .iter()
            .filter(|t| t.stage == Stage::Summoned)
            .cloned()
            .collect();

        let changes = zones.reconcile(&summoned);
        self.audit_zone_changes(&changes, &summoned).await;

        metrics::QUEUE_DEPTH.set(active.len() as i64);
        self.update_zone_gauge(&zones);
        Ok(())
    }

    /// Submit a driver's join request for admin review.
    pub async fn submit_request(
        &self,
        fields: JoinFields,
        identity: &Identity,
    ) -> Result<PendingRequest, QueueError> {
        validate_fields(&fields)?;

        let request = self.store.create_pending(fields, &identity.user_id)?;

        self.activity
            .emit(ActivityEvent::RequestSubmitted {
                request_id: request.id.clone(),
                po_number: request.po_number.clone(),
                submitted_by: identity.user_id.clone(),
            })
            .await;
        metrics::REQUEST_OUTCOMES
            .with_label_values(&["submitted"])
            .inc();

        tracing::info!(request_id = %request.id, po_number = %request.po_number, "Join request submitted");
        Ok(request)
    }

    /// Approve a pending request, entering the truck at the end of the queue.
    pub async fn approve_request(
        &self,
        request_id: &str,
        identity: &Identity,
    ) -> Result<Ticket, QueueError> {
        let _zones = self.zones.lock().await;

        let request = self
            .store
            .get_pending(request_id)?
            .ok_or_else(|| QueueError::NotFound(request_id.to_string()))?;

        if self.store.find_active_by_po(&request.po_number)?.is_some() {
            return Err(QueueError::Validation(format!(
                "PO {} already has an active ticket",
                request.po_number
            )));
        }

        let active = self.store.list_active()?;
        ensure_contiguous(&active)?;
        let position = allocate_next_position(&active)?;

        let ticket = self.store.create_ticket(NewTicket {
            fields: JoinFields {
                po_number: request.po_number.clone(),
                confirm_code: request.confirm_code.clone(),
                driver_name: request.driver_name.clone(),
                load_type: request.load_type,
            },
            position,
            requested_at: request.requested_at,
            po_validated: None,
            created_by: identity.user_id.clone(),
        })?;
        self.store.delete_pending(request_id)?;

        self.activity
            .emit(ActivityEvent::RequestApproved {
                request_id: request.id.clone(),
                ticket_id: ticket.id.clone(),
                po_number: ticket.po_number.clone(),
                position,
                approved_by: identity.user_id.clone(),
            })
            .await;
        self.notifier.emit(
            &ticket.po_number,
            NotificationKind::Success,
            &format!("Request approved - joined queue at position {}", position),
        );
        metrics::REQUEST_OUTCOMES
            .with_label_values(&["approved"])
            .inc();
        metrics::QUEUE_DEPTH.set((active.len() + 1) as i64);

        tracing::info!(ticket_id = %ticket.id, position, "Request approved");
        Ok(ticket)
    }

    /// Reject a pending request.
    pub async fn reject_request(
        &self,
        request_id: &str,
        reason: Option<String>,
        identity: &Identity,
    ) -> Result<PendingRequest, QueueError> {
        let request = self.store.delete_pending(request_id)?;

        self.activity
            .emit(ActivityEvent::RequestRejected {
                request_id: request.id.clone(),
                po_number: request.po_number.clone(),
                rejected_by: identity.user_id.clone(),
                reason: reason.clone(),
            })
            .await;
        let message = match reason {
            Some(ref r) => format!("Request rejected: {}", r),
            None => "Request rejected".to_string(),
        };
        self.notifier
            .emit(&request.po_number, NotificationKind::Error, &message);
        metrics::REQUEST_OUTCOMES
            .with_label_values(&["rejected"])
            .inc();

        Ok(request)
    }

    /// Create a ticket directly, bypassing the request flow.
    ///
    /// Used for walk-ups handled at the gate; the entry counts as
    /// pre-validated since an admin is standing in front of the truck.
    pub async fn create_manual_ticket(
        &self,
        fields: JoinFields,
        identity: &Identity,
    ) -> Result<Ticket, QueueError> {
        validate_fields(&fields)?;

        let _zones = self.zones.lock().await;

        if self.store.find_active_by_po(&fields.po_number)?.is_some() {
            return Err(QueueError::Validation(format!(
                "PO {} already has an active ticket",
                fields.po_number
            )));
        }

        let active = self.store.list_active()?;
        ensure_contiguous(&active)?;
        let position = allocate_next_position(&active)?;

        let ticket = self.store.create_ticket(NewTicket {
            fields,
            position,
            requested_at: Utc::now(),
            po_validated: Some(true),
            created_by: identity.user_id.clone(),
        })?;

        self.activity
            .emit(ActivityEvent::ManualTicketCreated {
                ticket_id: ticket.id.clone(),
                po_number: ticket.po_number.clone(),
                position,
                created_by: identity.user_id.clone(),
            })
            .await;
        self.notifier.emit(
            &ticket.po_number,
            NotificationKind::Success,
            &format!("Request approved - joined queue at position {}", position),
        );
        metrics::QUEUE_DEPTH.set((active.len() + 1) as i64);

        Ok(ticket)
    }

    /// Move a ticket to another stage.
    ///
    /// A transition to the ticket's current stage is a no-op and returns
    /// the ticket unchanged. Backward transitions are allowed; admins
    /// use them to correct mistakes.
    pub async fn transition_stage(
        &self,
        ticket_id: &str,
        to: Stage,
        identity: &Identity,
    ) -> Result<Ticket, QueueError> {
        let mut zones = self.zones.lock().await;

        let ticket = self
            .store
            .get_ticket(ticket_id)?
            .ok_or_else(|| QueueError::NotFound(ticket_id.to_string()))?;

        if ticket.stage == to {
            return Ok(ticket);
        }
        let from = ticket.stage;

        // Refuse the summon before touching anything if no zone is free.
        if to == Stage::Summoned
            && zones.zone_for_ticket(&ticket.id).is_none()
            && !zones.has_available()
        {
            metrics::SUMMON_REFUSALS.with_label_values(&[]).inc();
            tracing::warn!(ticket_id = %ticket.id, "Summon refused, no staging zone available");
            return Err(QueueError::CapacityExceeded);
        }

        let active = self.store.list_active()?;
        let others: Vec<Ticket> = active
            .iter()
            .filter(|t| t.id != ticket.id)
            .cloned()
            .collect();

        let new_position = if to.is_position_bearing() {
            if from.is_position_bearing() {
                ticket.position
            } else {
                // Re-entering the queue from staging or later.
                ensure_contiguous(&others)?;
                Some(allocate_next_position(&others)?)
            }
        } else {
            None
        };

        let updated = self.store.update_stage(&ticket.id, to, new_position)?;

        // Close the gap left behind when the ticket drops its position.
        if from.is_position_bearing() && !to.is_position_bearing() {
            if let Some(position) = ticket.position {
                let updates = renumber_after_removal(&others, position)?;
                if !updates.is_empty() {
                    self.store.apply_positions(&updates)?;
                }
            }
        }

        if to == Stage::Summoned {
            let zone_id = zones.assign(&updated.id)?;
            self.activity
                .emit(ActivityEvent::ZoneAssigned {
                    zone_id,
                    ticket_id: updated.id.clone(),
                    po_number: updated.po_number.clone(),
                })
                .await;
        } else if from == Stage::Summoned {
            if let Some(zone_id) = zones.release_ticket(&updated.id) {
                self.activity
                    .emit(ActivityEvent::ZoneReleased {
                        zone_id,
                        ticket_id: updated.id.clone(),
                        po_number: updated.po_number.clone(),
                    })
                    .await;
            }
        }

        self.activity
            .emit(ActivityEvent::StageChanged {
                ticket_id: updated.id.clone(),
                po_number: updated.po_number.clone(),
                from_stage: from.as_str().to_string(),
                to_stage: to.as_str().to_string(),
                changed_by: identity.user_id.clone(),
            })
            .await;
        self.notifier.emit(
            &updated.po_number,
            NotificationKind::StatusUpdate,
            to.driver_message(),
        );
        metrics::STAGE_TRANSITIONS
            .with_label_values(&[to.as_str()])
            .inc();
        metrics::QUEUE_DEPTH.set(self.store.list_active()?.len() as i64);
        self.update_zone_gauge(&zones);

        tracing::info!(ticket_id = %updated.id, from = %from, to = %to, "Stage changed");
        Ok(updated)
    }

    /// Record that the summoned truck is physically in its zone.
    pub async fn mark_arrived(&self, zone_id: u32, identity: &Identity) -> Result<Zone, QueueError> {
        let mut zones = self.zones.lock().await;

        let zone = zones.mark_arrived(zone_id)?.clone();

        if let Some(ref ticket_id) = zone.ticket_id {
            let po_number = self
                .store
                .get_ticket(ticket_id)?
                .map(|t| t.po_number)
                .unwrap_or_default();
            self.activity
                .emit(ActivityEvent::ZoneOccupied {
                    zone_id: zone.id,
                    ticket_id: ticket_id.clone(),
                    po_number,
                    marked_by: identity.user_id.clone(),
                })
                .await;
        }

        Ok(zone)
    }

    /// Remove a ticket from the system entirely.
    pub async fn remove_ticket(
        &self,
        ticket_id: &str,
        reason: Option<String>,
        identity: &Identity,
    ) -> Result<Ticket, QueueError> {
        let mut zones = self.zones.lock().await;

        let ticket = self.store.delete_ticket(ticket_id)?;

        if ticket.stage.is_position_bearing() {
            if let Some(position) = ticket.position {
                let remaining = self.store.list_active()?;
                let updates = renumber_after_removal(&remaining, position)?;
                if !updates.is_empty() {
                    self.store.apply_positions(&updates)?;
                }
            }
        }

        if let Some(zone_id) = zones.release_ticket(&ticket.id) {
            self.activity
                .emit(ActivityEvent::ZoneReleased {
                    zone_id,
                    ticket_id: ticket.id.clone(),
                    po_number: ticket.po_number.clone(),
                })
                .await;
        }

        self.activity
            .emit(ActivityEvent::TicketRemoved {
                ticket_id: ticket.id.clone(),
                po_number: ticket.po_number.clone(),
                removed_by: identity.user_id.clone(),
                reason: reason.clone(),
            })
            .await;
        let message = match reason {
            Some(ref r) => format!("Removed from queue: {}", r),
            None => "Removed from queue by facility staff".to_string(),
        };
        self.notifier
            .emit(&ticket.po_number, NotificationKind::AdminAction, &message);
        metrics::QUEUE_DEPTH.set(self.store.list_active()?.len() as i64);
        self.update_zone_gauge(&zones);

        tracing::info!(ticket_id = %ticket.id, "Ticket removed");
        Ok(ticket)
    }

    /// Move one ticket to a new 0-based index, renumbering the whole
    /// active queue in a single atomic batch.
    pub async fn reorder_queue(
        &self,
        ticket_id: &str,
        new_index: usize,
        identity: &Identity,
    ) -> Result<Vec<Ticket>, QueueError> {
        let _zones = self.zones.lock().await;

        let active = self.store.list_active()?;
        ensure_contiguous(&active)?;

        let from_position = active
            .iter()
            .find(|t| t.id == ticket_id)
            .and_then(|t| t.position)
            .ok_or_else(|| QueueError::NotFound(ticket_id.to_string()))?;
        let po_number = active
            .iter()
            .find(|t| t.id == ticket_id)
            .map(|t| t.po_number.clone())
            .unwrap_or_default();

        let order = reorder(&active, ticket_id, new_index)?;
        let updates = renumber_full(&order);
        self.store.apply_positions(&updates)?;

        let to_position = order
            .iter()
            .position(|id| id == ticket_id)
            .map(|i| (i + 1) as u32)
            .unwrap_or(from_position);

        self.activity
            .emit(ActivityEvent::QueueReordered {
                ticket_id: ticket_id.to_string(),
                po_number,
                from_position,
                to_position,
                reordered_by: identity.user_id.clone(),
            })
            .await;

        tracing::info!(ticket_id, from_position, to_position, "Queue reordered");
        Ok(self.store.list_active()?)
    }

    /// Record a back-office PO validation verdict.
    ///
    /// Orthogonal to the stage flow; a failed verdict flags the ticket
    /// for staff but does not move or notify the truck.
    pub async fn validate_po(
        &self,
        ticket_id: &str,
        valid: bool,
        reason: Option<&str>,
        identity: &Identity,
    ) -> Result<Ticket, QueueError> {
        let ticket = self.store.set_po_validation(ticket_id, valid, reason)?;

        self.activity
            .emit(ActivityEvent::PoValidationSet {
                ticket_id: ticket.id.clone(),
                po_number: ticket.po_number.clone(),
                valid,
                reason: reason.map(String::from),
                validated_by: identity.user_id.clone(),
            })
            .await;

        Ok(ticket)
    }

    /// The active queue in position order, with wait estimates.
    pub fn queue_snapshot(&self) -> Result<Vec<QueueEntry>, QueueError> {
        let active = self.store.list_active()?;
        Ok(active.into_iter().map(|t| self.entry(t)).collect())
    }

    pub fn list_pending(&self) -> Result<Vec<PendingRequest>, QueueError> {
        Ok(self.store.list_pending()?)
    }

    pub fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, QueueError> {
        Ok(self.store.list_tickets(filter)?)
    }

    pub fn get_ticket(&self, ticket_id: &str) -> Result<Ticket, QueueError> {
        self.store
            .get_ticket(ticket_id)?
            .ok_or_else(|| QueueError::NotFound(ticket_id.to_string()))
    }

    /// What the driver holding this PO number currently has in the system.
    pub fn lookup_po(&self, po_number: &str) -> Result<PoLookup, QueueError> {
        let ticket = self
            .store
            .find_active_by_po(po_number)?
            .map(|t| self.entry(t));
        let pending = self.store.find_pending_by_po(po_number)?;
        Ok(PoLookup { ticket, pending })
    }

    pub async fn zones_snapshot(&self) -> Vec<Zone> {
        self.zones.lock().await.zones().to_vec()
    }

    fn entry(&self, ticket: Ticket) -> QueueEntry {
        let estimated_wait_minutes = ticket
            .position
            .map(|p| p * self.facility.wait_minutes_per_truck);
        QueueEntry {
            ticket,
            estimated_wait_minutes,
        }
    }

    fn update_zone_gauge(&self, zones: &ZoneTracker) {
        let in_use = zones
            .zones()
            .iter()
            .filter(|z| z.ticket_id.is_some())
            .count();
        metrics::ZONES_IN_USE.set(in_use as i64);
    }

    async fn audit_zone_changes(&self, changes: &[super::ZoneChange], summoned: &[Ticket]) {
        for change in changes {
            match change {
                super::ZoneChange::Assigned { zone_id, ticket_id } => {
                    let po_number = summoned
                        .iter()
                        .find(|t| &t.id == ticket_id)
                        .map(|t| t.po_number.clone())
                        .unwrap_or_default();
                    self.activity
                        .emit(ActivityEvent::ZoneAssigned {
                            zone_id: *zone_id,
                            ticket_id: ticket_id.clone(),
                            po_number,
                        })
                        .await;
                }
                super::ZoneChange::Released { zone_id, ticket_id } => {
                    self.activity
                        .emit(ActivityEvent::ZoneReleased {
                            zone_id: *zone_id,
                            ticket_id: ticket_id.clone(),
                            po_number: String::new(),
                        })
                        .await;
                }
            }
        }
    }
}

fn validate_fields(fields: &JoinFields) -> Result<(), QueueError> {
    if !is_valid_po_number(&fields.po_number) {
        return Err(QueueError::Validation(
            "PO number must be exactly 7 digits".to_string(),
        ));
    }
    if !is_valid_confirm_code(&fields.confirm_code) {
        return Err(QueueError::Validation(
            "confirmation code must be a 10-digit phone number".to_string(),
        ));
    }
    Ok(())
}
