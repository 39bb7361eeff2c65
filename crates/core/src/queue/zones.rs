//! In-memory staging zone tracking.
//!
//! Zone bindings are derived state: the tickets table is the source of
//! truth, and [`ZoneTracker::reconcile`] re-derives the bindings from
//! the set of summoned tickets whenever the two could have drifted.

use serde::{Deserialize, Serialize};

use crate::ticket::Ticket;

use super::QueueError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneStatus {
    /// No truck bound to the zone.
    Available,
    /// A truck has been summoned to the zone but has not arrived.
    Pending,
    /// The truck is physically in the zone.
    Occupied,
}

impl ZoneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneStatus::Available => "available",
            ZoneStatus::Pending => "pending",
            ZoneStatus::Occupied => "occupied",
        }
    }
}

/// A single staging zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: u32,
    pub status: ZoneStatus,
    pub ticket_id: Option<String>,
}

/// A change made to zone state, reported so callers can audit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneChange {
    Assigned { zone_id: u32, ticket_id: String },
    Released { zone_id: u32, ticket_id: String },
}

/// Tracks the facility's staging zones. Not internally synchronized;
/// the queue service guards it with its mutation lock.
pub struct ZoneTracker {
    zones: Vec<Zone>,
}

impl ZoneTracker {
    pub fn new(count: u32) -> Self {
        let zones = (1..=count)
            .map(|id| Zone {
                id,
                status: ZoneStatus::Available,
                ticket_id: None,
            })
            .collect();
        Self { zones }
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn has_available(&self) -> bool {
        self.zones.iter().any(|z| z.status == ZoneStatus::Available)
    }

    pub fn zone_for_ticket(&self, ticket_id: &str) -> Option<&Zone> {
        self.zones
            .iter()
            .find(|z| z.ticket_id.as_deref() == Some(ticket_id))
    }

    /// Bind a ticket to the lowest-numbered available zone, moving it to
    /// pending. Idempotent for a ticket that already holds a zone.
    pub fn assign(&mut self, ticket_id: &str) -> Result<u32, QueueError> {
        if let Some(zone) = self.zone_for_ticket(ticket_id) {
            return Ok(zone.id);
        }

        let zone = self
            .zones
            .iter_mut()
            .find(|z| z.status == ZoneStatus::Available)
            .ok_or(QueueError::CapacityExceeded)?;

        zone.status = ZoneStatus::Pending;
        zone.ticket_id = Some(ticket_id.to_string());
        Ok(zone.id)
    }

    /// Record physical arrival: pending becomes occupied.
    pub fn mark_arrived(&mut self, zone_id: u32) -> Result<&Zone, QueueError> {
        let zone = self
            .zones
            .iter_mut()
            .find(|z| z.id == zone_id)
            .ok_or_else(|| QueueError::NotFound(format!("zone {}", zone_id)))?;

        if zone.status != ZoneStatus::Pending {
            return Err(QueueError::Consistency(format!(
                "zone {} is not awaiting arrival",
                zone_id
            )));
        }

        zone.status = ZoneStatus::Occupied;
        Ok(zone)
    }

    pub fn release(&mut self, zone_id: u32) -> Result<(), QueueError> {
        let zone = self
            .zones
            .iter_mut()
            .find(|z| z.id == zone_id)
            .ok_or_else(|| QueueError::NotFound(format!("zone {}", zone_id)))?;

        zone.status = ZoneStatus::Available;
        zone.ticket_id = None;
        Ok(())
    }

    /// Free whatever zone the ticket holds, if any.
    pub fn release_ticket(&mut self, ticket_id: &str) -> Option<u32> {
        let zone = self
            .zones
            .iter_mut()
            .find(|z| z.ticket_id.as_deref() == Some(ticket_id))?;

        zone.status = ZoneStatus::Available;
        zone.ticket_id = None;
        Some(zone.id)
    }

    /// Re-derive zone bindings from the summoned tickets: zones bound to
    /// tickets that are no longer summoned are freed, then summoned
    /// tickets without a zone are assigned in order of when they joined
    /// the queue. Existing bindings and occupancy are preserved, so the
    /// call is idempotent.
    pub fn reconcile(&mut self, summoned: &[Ticket]) -> Vec<ZoneChange> {
        let mut changes = Vec::new();

        for zone in &mut self.zones {
            if let Some(ref ticket_id) = zone.ticket_id {
                if !summoned.iter().any(|t| &t.id == ticket_id) {
                    changes.push(ZoneChange::Released {
                        zone_id: zone.id,
                        ticket_id: ticket_id.clone(),
                    });
                    zone.status = ZoneStatus::Available;
                    zone.ticket_id = None;
                }
            }
        }

        let mut unbound: Vec<&Ticket> = summoned
            .iter()
            .filter(|t| self.zone_for_ticket(&t.id).is_none())
            .collect();
        unbound.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.id.cmp(&b.id)));

        for ticket in unbound {
            let Some(zone) = self
                .zones
                .iter_mut()
                .find(|z| z.status == ZoneStatus::Available)
            else {
                break;
            };
            zone.status = ZoneStatus::Pending;
            zone.ticket_id = Some(ticket.id.clone());
            changes.push(ZoneChange::Assigned {
                zone_id: zone.id,
                ticket_id: ticket.id.clone(),
            });
        }

        changes
    }
}
