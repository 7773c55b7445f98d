use super::commands::BatchAction;
use super::value_objects::StatusCode;
use crate::models::OrderId;

// ============================================================================
// Order List Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("Invalid page size: {0} (allowed: 10, 20, 30, 50, 100)")]
    InvalidPageSize(u32),
}

/// Precondition violations caught before a batch action reaches the server.
///
/// These are shown as transient warnings; none of them is fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchWarning {
    #[error("Select at least one order first")]
    EmptySelection,

    #[error("Orders with status {status} cannot be cancelled and refunded (order {order_id})")]
    DisallowedStatusMix { order_id: OrderId, status: StatusCode },

    #[error("Only failed orders can be resent")]
    NotAllFailed,

    #[error("Selection contains orders whose status cannot be changed manually")]
    StatusChangeNotAllowed,

    #[error("Another batch action is being submitted")]
    Busy,

    #[error("A {0} confirmation is already open")]
    AlreadyConfirming(BatchAction),

    #[error("No batch action is awaiting confirmation")]
    NothingToConfirm,
}
