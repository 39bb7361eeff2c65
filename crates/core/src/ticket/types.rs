//! Core queue data types.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minutes of estimated wait per truck ahead in the queue.
///
/// This is a crude linear estimate shown to drivers, not a scheduling
/// objective.
pub const WAIT_MINUTES_PER_TRUCK: u32 = 15;

static PO_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{7}$").unwrap());
static CONFIRM_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{10}$").unwrap());

/// Returns true if the purchase-order number is well formed (exactly 7 digits).
pub fn is_valid_po_number(po_number: &str) -> bool {
    PO_NUMBER_RE.is_match(po_number)
}

/// Returns true if the confirmation code is well formed (10-digit phone number).
pub fn is_valid_confirm_code(code: &str) -> bool {
    CONFIRM_CODE_RE.is_match(code)
}

/// Error returned when parsing an enum from its stored string form fails.
#[derive(Debug, Error)]
#[error("unknown value: {0}")]
pub struct ParseEnumError(pub String);

/// Processing stage of a ticket in the check-in flow.
///
/// Stages are ordered, but backward moves are a deliberate policy
/// (admins may correct mistakes), not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Queued,
    Summoned,
    Staging,
    Loading,
    Completed,
}

impl Stage {
    /// The stage as a string for storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Queued => "queued",
            Stage::Summoned => "summoned",
            Stage::Staging => "staging",
            Stage::Loading => "loading",
            Stage::Completed => "completed",
        }
    }

    /// Whether tickets in this stage carry a queue position.
    ///
    /// Only queued and summoned tickets occupy the 1..N position
    /// sequence; once a truck is physically on site (staging/loading)
    /// its position is meaningless.
    pub fn is_position_bearing(&self) -> bool {
        matches!(self, Stage::Queued | Stage::Summoned)
    }

    /// Human-readable message sent to the driver when entering this stage.
    pub fn driver_message(&self) -> &'static str {
        match self {
            Stage::Queued => "You are back in the waiting queue.",
            Stage::Summoned => "You are summoned! Please proceed to the staging area.",
            Stage::Staging => "You are now in the staging area.",
            Stage::Loading => "You are now in the loading bay.",
            Stage::Completed => "Loading completed. Thank you!",
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Stage::Queued),
            "summoned" => Ok(Stage::Summoned),
            "staging" => Ok(Stage::Staging),
            "loading" => Ok(Stage::Loading),
            "completed" => Ok(Stage::Completed),
            other => Err(ParseEnumError(other.to_string())),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the truck is picking up or delivering. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadType {
    Pickup,
    Delivery,
}

impl LoadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadType::Pickup => "pickup",
            LoadType::Delivery => "delivery",
        }
    }
}

impl std::str::FromStr for LoadType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pickup" => Ok(LoadType::Pickup),
            "delivery" => Ok(LoadType::Delivery),
            other => Err(ParseEnumError(other.to_string())),
        }
    }
}

/// One truck's record of occupancy in the active queue.
///
/// Tickets are exclusively owned by the queue store; everything else
/// works with read-only copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Opaque unique id, assigned at creation.
    pub id: String,
    /// Purchase-order number, the business key for out-of-band lookups.
    pub po_number: String,
    /// Phone-derived confirmation code for out-of-band verification.
    pub confirm_code: String,
    /// Driver name; optional since later revisions anonymized to PO-only.
    pub driver_name: Option<String>,
    pub load_type: LoadType,
    pub stage: Stage,
    /// 1-based queue position; `Some` iff the stage is position-bearing.
    pub position: Option<u32>,
    /// Back-office PO validation verdict; `None` until a verdict is set.
    pub po_validated: Option<bool>,
    pub po_validation_reason: Option<String>,
    /// When the original join request was submitted.
    pub requested_at: DateTime<Utc>,
    /// When the ticket entered the queue. Ties in zone assignment
    /// resolve by ascending `joined_at`.
    pub joined_at: DateTime<Utc>,
    /// Identity that created the ticket (approving admin or manual entry).
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
}

/// A driver's unapproved join request.
///
/// Created on submission, destroyed on approval (becoming a [`Ticket`])
/// or rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub id: String,
    pub po_number: String,
    pub confirm_code: String,
    pub driver_name: Option<String>,
    pub load_type: LoadType,
    pub requested_at: DateTime<Utc>,
    pub submitted_by: String,
}

/// Fields supplied by a driver (or admin, for manual entry) to join the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinFields {
    pub po_number: String,
    pub confirm_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    pub load_type: LoadType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_po_number_validation() {
        assert!(is_valid_po_number("1234567"));
        assert!(!is_valid_po_number("123456"));
        assert!(!is_valid_po_number("12345678"));
        assert!(!is_valid_po_number("12345a7"));
        assert!(!is_valid_po_number(""));
    }

    #[test]
    fn test_confirm_code_validation() {
        assert!(is_valid_confirm_code("5551234567"));
        assert!(!is_valid_confirm_code("555123456"));
        assert!(!is_valid_confirm_code("555-123-4567"));
    }

    #[test]
    fn test_stage_round_trip() {
        for stage in [
            Stage::Queued,
            Stage::Summoned,
            Stage::Staging,
            Stage::Loading,
            Stage::Completed,
        ] {
            let parsed: Stage = stage.as_str().parse().unwrap();
            assert_eq!(parsed, stage);
        }
        assert!("parked".parse::<Stage>().is_err());
    }

    #[test]
    fn test_position_bearing_stages() {
        assert!(Stage::Queued.is_position_bearing());
        assert!(Stage::Summoned.is_position_bearing());
        assert!(!Stage::Staging.is_position_bearing());
        assert!(!Stage::Loading.is_position_bearing());
        assert!(!Stage::Completed.is_position_bearing());
    }

    #[test]
    fn test_stage_serde_uses_snake_case() {
        let json = serde_json::to_string(&Stage::Summoned).unwrap();
        assert_eq!(json, "\"summoned\"");
        let parsed: Stage = serde_json::from_str("\"loading\"").unwrap();
        assert_eq!(parsed, Stage::Loading);
    }
}
