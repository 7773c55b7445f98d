use serde::{Deserialize, Serialize};
use std::fmt;

use super::value_objects::ManualStatus;
use crate::models::{OrderId, OrderRow};

// ============================================================================
// Batch Commands - Represent user intent for mutating operations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "target", rename_all = "snake_case")]
pub enum BatchAction {
    ChangeStatus(ManualStatus),
    Resend,
    CancelAndRefund,
}

impl BatchAction {
    /// Stable label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            BatchAction::ChangeStatus(_) => "change_status",
            BatchAction::Resend => "resend",
            BatchAction::CancelAndRefund => "cancel_and_refund",
        }
    }
}

impl fmt::Display for BatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchAction::ChangeStatus(status) => {
                write!(f, "status change to {}", super::StatusCode::from(*status))
            }
            BatchAction::Resend => f.write_str("resend"),
            BatchAction::CancelAndRefund => f.write_str("cancel and refund"),
        }
    }
}

/// Which records a batch action applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchScope {
    /// Row-level action button.
    Single(OrderRow),
    /// Toolbar action over the current selection.
    Selection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub action: BatchAction,
    pub scope: BatchScope,
}

impl BatchRequest {
    pub fn single(action: BatchAction, row: OrderRow) -> Self {
        Self {
            action,
            scope: BatchScope::Single(row),
        }
    }

    pub fn selection(action: BatchAction) -> Self {
        Self {
            action,
            scope: BatchScope::Selection,
        }
    }
}

/// Ids sent to the Order Service for one mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderTarget {
    One(OrderId),
    Many(Vec<OrderId>),
}

impl OrderTarget {
    pub fn ids(&self) -> Vec<OrderId> {
        match self {
            OrderTarget::One(id) => vec![*id],
            OrderTarget::Many(ids) => ids.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OrderTarget::One(_) => 1,
            OrderTarget::Many(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &OrderId) -> bool {
        match self {
            OrderTarget::One(single) => single == id,
            OrderTarget::Many(ids) => ids.contains(id),
        }
    }
}
