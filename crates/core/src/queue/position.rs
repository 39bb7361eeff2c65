//! Position arithmetic for the active queue.
//!
//! Positions are 1-based and gap-free over the position-bearing stages.
//! Every function here is pure; callers persist the resulting updates
//! in a single batch.

use std::collections::BTreeSet;

use crate::ticket::Ticket;

use super::QueueError;

/// Pick the position for a newly joining ticket: the smallest positive
/// integer not already taken. With a contiguous queue this is always
/// len + 1, but if a gap ever appears the newcomer fills it instead of
/// growing the tail past it.
pub fn allocate_next_position(active: &[Ticket]) -> Result<u32, QueueError> {
    let mut taken = BTreeSet::new();
    for ticket in active {
        let position = ticket
            .position
            .ok_or_else(|| QueueError::Consistency(format!("ticket {} has no position", ticket.id)))?;
        if !taken.insert(position) {
            return Err(QueueError::Consistency(format!(
                "duplicate position {} in active queue",
                position
            )));
        }
    }

    let mut candidate = 1;
    while taken.contains(&candidate) {
        candidate += 1;
    }
    Ok(candidate)
}

/// Verify the active queue holds exactly positions 1..=N.
pub fn ensure_contiguous(active: &[Ticket]) -> Result<(), QueueError> {
    let mut taken = BTreeSet::new();
    for ticket in active {
        let position = ticket
            .position
            .ok_or_else(|| QueueError::Consistency(format!("ticket {} has no position", ticket.id)))?;
        if !taken.insert(position) {
            return Err(QueueError::Consistency(format!(
                "duplicate position {} in active queue",
                position
            )));
        }
    }

    for (i, position) in taken.iter().enumerate() {
        let expected = (i + 1) as u32;
        if *position != expected {
            return Err(QueueError::Consistency(format!(
                "position gap: expected {} found {}",
                expected, position
            )));
        }
    }
    Ok(())
}

/// Position updates after one ticket leaves the active queue: everything
/// behind the removed position shifts up by one. `active` must no longer
/// contain the removed ticket.
pub fn renumber_after_removal(
    active: &[Ticket],
    removed_position: u32,
) -> Result<Vec<(String, u32)>, QueueError> {
    let mut updates = Vec::new();
    for ticket in active {
        let position = ticket
            .position
            .ok_or_else(|| QueueError::Consistency(format!("ticket {} has no position", ticket.id)))?;
        if position == removed_position {
            return Err(QueueError::Consistency(format!(
                "position {} still occupied after removal",
                removed_position
            )));
        }
        if position > removed_position {
            updates.push((ticket.id.clone(), position - 1));
        }
    }
    Ok(updates)
}

/// Assign positions 1..=N following the given order.
pub fn renumber_full(ordered_ids: &[String]) -> Vec<(String, u32)> {
    ordered_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), (i + 1) as u32))
        .collect()
}
