use crate::ticket::Ticket;

use super::QueueError;

/// Compute the new ordering after moving one ticket to a target index.
/// `active` is the current queue in position order; `new_index` is
/// 0-based and clamped to the list bounds.
pub fn reorder(active: &[Ticket], moved_id: &str, new_index: usize) -> Result<Vec<String>, QueueError> {
    let mut ids: Vec<String> = active.iter().map(|t| t.id.clone()).collect();

    let current = ids
        .iter()
        .position(|id| id == moved_id)
        .ok_or_else(|| QueueError::NotFound(moved_id.to_string()))?;

    let target = new_index.min(ids.len().saturating_sub(1));
    let id = ids.remove(current);
    ids.insert(target, id);

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::{LoadType, Stage, Ticket};
    use chrono::Utc;

    fn ticket(id: &str, position: u32) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: id.to_string(),
            po_number: "1234567".to_string(),
            confirm_code: "5551234567".to_string(),
            driver_name: None,
            load_type: LoadType::Pickup,
            stage: Stage::Queued,
            position: Some(position),
            po_validated: None,
            po_validation_reason: None,
            requested_at: now,
            joined_at: now,
            created_by: "admin".to_string(),
            updated_at: now,
        }
    }

    fn queue() -> Vec<Ticket> {
        vec![
            ticket("a", 1),
            ticket("b", 2),
            ticket("c", 3),
            ticket("d", 4),
        ]
    }

    #[test]
    fn test_move_to_front() {
        let ids = reorder(&queue(), "d", 0).unwrap();
        assert_eq!(ids, vec!["d", "a", "b", "c"]);
    }

    #[test]
    fn test_move_to_back() {
        let ids = reorder(&queue(), "a", 3).unwrap();
        assert_eq!(ids, vec!["b", "c", "d", "a"]);
    }

    #[test]
    fn test_move_to_middle() {
        let ids = reorder(&queue(), "a", 2).unwrap();
        assert_eq!(ids, vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn test_move_to_same_index_is_noop() {
        let ids = reorder(&queue(), "b", 1).unwrap();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_index_past_end_clamps_to_last() {
        let ids = reorder(&queue(), "a", 99).unwrap();
        assert_eq!(ids, vec!["b", "c", "d", "a"]);
    }

    #[test]
    fn test_unknown_ticket() {
        assert!(matches!(
            reorder(&queue(), "zzz", 0),
            Err(QueueError::NotFound(_))
        ));
    }
}
