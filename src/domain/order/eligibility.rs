use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::value_objects::StatusCode;
use crate::models::{OrderId, OrderRow};

// ============================================================================
// Selection Eligibility
// ============================================================================
//
// Decides which rows may join the batch selection. The rule is a pure
// function of (candidate status, current selection, active status filter)
// and is recomputed from the live selection on every call:
//
// 1. Status filter is exactly {CANCELED}: only CANCELED rows.
// 2. Selection not empty:
//    a. holds a CANCELED/FAIL/ERROR row: reject PARTIAL/PENDING/PROCESSING/
//       IN_PROGRESS/COMPLETED
//    b. else holds an active-lifecycle row: reject CANCELED/FAIL/ERROR
//    c. else anything goes
// 3. Selection empty: reject CANCELED/FAIL/ERROR.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOrder {
    pub id: OrderId,
    pub status: StatusCode,
}

impl From<&OrderRow> for SelectedOrder {
    fn from(row: &OrderRow) -> Self {
        Self {
            id: row.id,
            status: row.status,
        }
    }
}

/// Rows chosen for a batch action, in the order they were picked.
///
/// Inserts go through [`SelectionSet::try_insert`], so every member is
/// compatible with the ones chosen before it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSet {
    entries: Vec<SelectedOrder>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &OrderId) -> bool {
        self.entries.iter().any(|entry| entry.id == *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectedOrder> {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<OrderId> {
        self.entries.iter().map(|entry| entry.id).collect()
    }

    /// Add `row` if the eligibility rule admits it. Returns whether it was added.
    pub fn try_insert(&mut self, row: &OrderRow, status_filter: &BTreeSet<StatusCode>) -> bool {
        if self.contains(&row.id) {
            return true;
        }
        if !is_selectable(row, self, status_filter) {
            return false;
        }
        self.entries.push(SelectedOrder::from(row));
        true
    }

    pub fn remove(&mut self, id: &OrderId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != *id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

pub fn is_selectable(
    candidate: &OrderRow,
    selection: &SelectionSet,
    status_filter: &BTreeSet<StatusCode>,
) -> bool {
    is_status_selectable(candidate.status, selection, status_filter)
}

pub fn is_status_selectable(
    candidate: StatusCode,
    selection: &SelectionSet,
    status_filter: &BTreeSet<StatusCode>,
) -> bool {
    // Canceled orders have no joint operation with anything else
    if status_filter.len() == 1 && status_filter.contains(&StatusCode::Canceled) {
        return candidate == StatusCode::Canceled;
    }

    if selection.is_empty() {
        return !candidate.is_terminal_negative();
    }

    if selection.iter().any(|s| s.status.is_terminal_negative()) {
        !candidate.is_active_lifecycle()
    } else if selection.iter().any(|s| s.status.is_active_lifecycle()) {
        !candidate.is_terminal_negative()
    } else {
        true
    }
}

/// Every selected order failed, so the whole selection can be resent.
pub fn can_resend_all(selection: &SelectionSet) -> bool {
    !selection.is_empty() && selection.iter().all(|s| s.status == StatusCode::Fail)
}

/// No selected order blocks a manual status change. Vacuously true when empty.
pub fn can_change_status_all(selection: &SelectionSet) -> bool {
    !selection.iter().any(|s| s.status.blocks_status_change())
}

// ============================================================================
// Unit Tests
// ============================================================================
