use actix::prelude::*;
use serde::Serialize;

use super::workflow::{BatchOutcome, BatchPrompt, WorkflowPhase};
use crate::domain::order::{BatchAction, BatchRequest, BatchWarning, FilterField, FilterState, SelectionSet};
use crate::models::OrderRow;

// ============================================================================
// Controller Messages
// ============================================================================

/// Update one filter field.
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct SetField(pub FilterField);

/// Debounce tick for the search box. Dropped unless `generation` is the
/// latest one handed out.
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub(crate) struct SearchSettled {
    pub generation: u64,
    pub value: String,
}

/// Re-run the current query (retry after a failure, or after a mutation).
#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "()")]
pub struct Refresh;

#[derive(Message, Debug, Clone)]
#[rtype(result = "SelectionChange")]
pub struct ToggleRow(pub OrderRow);

/// Header checkbox: add every loaded row the rule admits. Returns how many
/// rows were added.
#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "usize")]
pub struct SelectAllEligible;

#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "()")]
pub struct ClearSelection;

#[derive(Message, Debug, Clone)]
#[rtype(result = "bool")]
pub struct IsSelectable(pub OrderRow);

#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "ControllerSnapshot")]
pub struct GetSnapshot;

#[derive(Message, Debug, Clone)]
#[rtype(result = "Result<BatchPrompt, BatchWarning>")]
pub struct TriggerBatch(pub BatchRequest);

#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "Result<BatchOutcome, BatchWarning>")]
pub struct ConfirmBatch;

#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "Result<(), BatchWarning>")]
pub struct DeclineBatch;

/// Unmount: reset everything and stop the controller.
#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "()")]
pub struct Teardown;

// ============================================================================
// Replies
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Added,
    Removed,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// Inline warning or acknowledgment shown next to the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

/// Everything the table view and dialogs read from the controller.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerSnapshot {
    pub filter: FilterState,
    pub debounced_search: String,
    pub rows: Vec<OrderRow>,
    pub total_count: u64,
    pub is_loading: bool,
    pub is_stale: bool,
    pub has_negative_profit: bool,
    pub selection: SelectionSet,
    pub can_resend_all: bool,
    pub can_change_status_all: bool,
    pub workflow_phase: WorkflowPhase,
    /// Action behind the open confirmation or the running submission.
    pub pending_action: Option<BatchAction>,
    pub busy: bool,
    pub notice: Option<Notice>,
}
