use serde::Serialize;

use crate::domain::order::{
    can_change_status_all, can_resend_all, BatchAction, BatchRequest, BatchScope, BatchWarning,
    OrderTarget, SelectedOrder, SelectionSet, StatusCode,
};
use crate::models::OrderId;
use crate::service::{MutationEnvelope, ServiceError};

// ============================================================================
// Batch Action Workflow
// ============================================================================
//
// Idle -> Confirming -> Submitting -> Settled
//
// - trigger:  Idle/Settled -> Confirming, after precondition checks
// - decline:  Confirming -> Idle, no side effects
// - confirm:  Confirming -> Submitting, hands out the one mutation to send
// - settle:   Submitting -> Settled on success, -> Idle on failure
//
// Only one mutation is ever outstanding; triggers while Submitting are
// refused with `BatchWarning::Busy`.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkflowPhase {
    Idle,
    Confirming,
    Submitting,
    Settled,
}

/// A batch action waiting for (or going through) submission.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingBatch {
    pub action: BatchAction,
    pub target: OrderTarget,
}

/// What the confirmation dialog shows.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPrompt {
    pub action: BatchAction,
    pub order_ids: Vec<OrderId>,
}

impl BatchPrompt {
    pub fn count(&self) -> usize {
        self.order_ids.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Succeeded {
        action: BatchAction,
        count: usize,
        message: String,
    },
    Failed {
        action: BatchAction,
        message: String,
    },
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Succeeded { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            BatchOutcome::Succeeded { message, .. } | BatchOutcome::Failed { message, .. } => message,
        }
    }
}

pub struct BatchWorkflow {
    phase: WorkflowPhase,
    pending: Option<PendingBatch>,
    default_failure_message: String,
}

impl BatchWorkflow {
    pub fn new(default_failure_message: impl Into<String>) -> Self {
        Self {
            phase: WorkflowPhase::Idle,
            pending: None,
            default_failure_message: default_failure_message.into(),
        }
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase == WorkflowPhase::Submitting
    }

    pub fn pending(&self) -> Option<&PendingBatch> {
        self.pending.as_ref()
    }

    /// Validate a batch request and open its confirmation.
    pub fn trigger(
        &mut self,
        request: BatchRequest,
        selection: &SelectionSet,
    ) -> Result<BatchPrompt, BatchWarning> {
        match self.phase {
            WorkflowPhase::Submitting => return Err(BatchWarning::Busy),
            WorkflowPhase::Confirming => {
                let open = self
                    .pending
                    .as_ref()
                    .map(|p| p.action)
                    .unwrap_or(request.action);
                return Err(BatchWarning::AlreadyConfirming(open));
            }
            WorkflowPhase::Idle | WorkflowPhase::Settled => {}
        }

        let (entries, target, scoped_to_selection) = match &request.scope {
            BatchScope::Single(row) => (vec![SelectedOrder::from(row)], OrderTarget::One(row.id), false),
            BatchScope::Selection => {
                if selection.is_empty() {
                    return Err(BatchWarning::EmptySelection);
                }
                let entries: Vec<SelectedOrder> = selection.iter().copied().collect();
                (entries, OrderTarget::Many(selection.ids()), true)
            }
        };

        check_preconditions(request.action, &entries, scoped_to_selection.then_some(selection))?;

        let prompt = BatchPrompt {
            action: request.action,
            order_ids: target.ids(),
        };

        tracing::info!(
            action = request.action.label(),
            count = prompt.count(),
            "Batch action awaiting confirmation"
        );

        self.pending = Some(PendingBatch {
            action: request.action,
            target,
        });
        self.phase = WorkflowPhase::Confirming;

        Ok(prompt)
    }

    /// Close the confirmation without doing anything.
    pub fn decline(&mut self) -> Result<BatchAction, BatchWarning> {
        if self.phase != WorkflowPhase::Confirming {
            return Err(BatchWarning::NothingToConfirm);
        }
        let action = self
            .pending
            .take()
            .map(|p| p.action)
            .ok_or(BatchWarning::NothingToConfirm)?;

        tracing::debug!(action = action.label(), "Batch action declined");
        self.phase = WorkflowPhase::Idle;
        Ok(action)
    }

    /// Confirm the open prompt. The returned batch must be submitted and
    /// then passed back through [`BatchWorkflow::settle`].
    pub fn confirm(&mut self) -> Result<PendingBatch, BatchWarning> {
        match self.phase {
            WorkflowPhase::Submitting => return Err(BatchWarning::Busy),
            WorkflowPhase::Confirming => {}
            WorkflowPhase::Idle | WorkflowPhase::Settled => return Err(BatchWarning::NothingToConfirm),
        }

        let pending = self.pending.clone().ok_or(BatchWarning::NothingToConfirm)?;
        self.phase = WorkflowPhase::Submitting;

        tracing::info!(
            action = pending.action.label(),
            count = pending.target.len(),
            "Submitting batch action"
        );

        Ok(pending)
    }

    /// Record the server's answer for the batch in flight.
    pub fn settle(&mut self, reply: Result<MutationEnvelope, ServiceError>) -> BatchOutcome {
        let pending = self.pending.take();
        let (action, count) = match &pending {
            Some(p) => (p.action, p.target.len()),
            None => (BatchAction::Resend, 0),
        };

        let outcome = match reply {
            Ok(envelope) if envelope.is_success() => BatchOutcome::Succeeded {
                action,
                count,
                message: envelope
                    .message
                    .unwrap_or_else(|| format!("{action} done for {count} order(s)")),
            },
            Ok(envelope) => BatchOutcome::Failed {
                action,
                message: envelope
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| self.default_failure_message.clone()),
            },
            Err(error) => {
                tracing::error!(action = action.label(), error = %error, "Batch request failed");
                BatchOutcome::Failed {
                    action,
                    message: self.default_failure_message.clone(),
                }
            }
        };

        self.phase = if outcome.is_success() {
            WorkflowPhase::Settled
        } else {
            WorkflowPhase::Idle
        };

        outcome
    }

    /// Drop an open confirmation, e.g. when the selection it was built from
    /// is cleared. A submission in flight is left alone.
    pub fn dismiss(&mut self) {
        if self.phase == WorkflowPhase::Confirming {
            self.pending = None;
            self.phase = WorkflowPhase::Idle;
        }
    }
}

fn check_preconditions(
    action: BatchAction,
    entries: &[SelectedOrder],
    selection: Option<&SelectionSet>,
) -> Result<(), BatchWarning> {
    match action {
        BatchAction::CancelAndRefund => {
            if let Some(blocked) = entries.iter().find(|e| e.status.blocks_cancel_and_refund()) {
                tracing::warn!(
                    order_id = %blocked.id,
                    status = %blocked.status,
                    "Cancel and refund blocked by order status"
                );
                return Err(BatchWarning::DisallowedStatusMix {
                    order_id: blocked.id,
                    status: blocked.status,
                });
            }
        }
        BatchAction::Resend => {
            let all_failed = match selection {
                Some(selection) => can_resend_all(selection),
                None => entries.iter().all(|e| e.status == StatusCode::Fail),
            };
            if !all_failed {
                return Err(BatchWarning::NotAllFailed);
            }
        }
        BatchAction::ChangeStatus(_) => {
            let allowed = match selection {
                Some(selection) => can_change_status_all(selection),
                None => !entries.iter().any(|e| e.status.blocks_status_change()),
            };
            if !allowed {
                return Err(BatchWarning::StatusChangeNotAllowed);
            }
        }
    }
    Ok(())
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::ManualStatus;
    use crate::models::fixtures::row;
    use std::collections::BTreeSet;

    const DEFAULT: &str = "Something went wrong";

    fn selection(statuses: &[StatusCode]) -> SelectionSet {
        let mut selection = SelectionSet::new();
        let no_filter = BTreeSet::new();
        for status in statuses {
            assert!(selection.try_insert(&row(*status), &no_filter), "{status}");
        }
        selection
    }

    #[test]
    fn test_empty_selection_short_circuits() {
        let mut workflow = BatchWorkflow::new(DEFAULT);
        let result = workflow.trigger(BatchRequest::selection(BatchAction::Resend), &SelectionSet::new());

        assert_eq!(result, Err(BatchWarning::EmptySelection));
        assert_eq!(workflow.phase(), WorkflowPhase::Idle);
    }

    #[test]
    fn test_cancel_and_refund_with_failed_order_never_confirms() {
        let mut workflow = BatchWorkflow::new(DEFAULT);
        // AWAITING opens the selection to FAIL
        let selection = selection(&[StatusCode::Awaiting, StatusCode::Fail]);

        let result = workflow.trigger(BatchRequest::selection(BatchAction::CancelAndRefund), &selection);

        assert!(matches!(
            result,
            Err(BatchWarning::DisallowedStatusMix { status: StatusCode::Fail, .. })
        ));
        assert_eq!(workflow.phase(), WorkflowPhase::Idle);
        assert!(workflow.pending().is_none());
    }

    #[test]
    fn test_single_cancel_of_canceled_row_is_blocked() {
        let mut workflow = BatchWorkflow::new(DEFAULT);
        let request = BatchRequest::single(BatchAction::CancelAndRefund, row(StatusCode::Canceled));
        assert!(workflow.trigger(request, &SelectionSet::new()).is_err());
    }

    #[test]
    fn test_resend_requires_all_failed() {
        let mut workflow = BatchWorkflow::new(DEFAULT);
        let mixed = selection(&[StatusCode::Awaiting, StatusCode::Fail]);
        assert_eq!(
            workflow.trigger(BatchRequest::selection(BatchAction::Resend), &mixed),
            Err(BatchWarning::NotAllFailed)
        );

        let single = BatchRequest::single(BatchAction::Resend, row(StatusCode::Fail));
        assert!(workflow.trigger(single, &SelectionSet::new()).is_ok());
    }

    #[test]
    fn test_status_change_gate() {
        let mut workflow = BatchWorkflow::new(DEFAULT);
        let blocked = selection(&[StatusCode::Awaiting]);
        let action = BatchAction::ChangeStatus(ManualStatus::Completed);
        assert_eq!(
            workflow.trigger(BatchRequest::selection(action), &blocked),
            Err(BatchWarning::StatusChangeNotAllowed)
        );
    }

    #[test]
    fn test_decline_returns_to_idle() {
        let mut workflow = BatchWorkflow::new(DEFAULT);
        let selection = selection(&[StatusCode::Pending]);
        let action = BatchAction::ChangeStatus(ManualStatus::Processing);

        let prompt = workflow.trigger(BatchRequest::selection(action), &selection).unwrap();
        assert_eq!(prompt.count(), 1);
        assert_eq!(workflow.phase(), WorkflowPhase::Confirming);

        assert_eq!(workflow.decline(), Ok(action));
        assert_eq!(workflow.phase(), WorkflowPhase::Idle);
        assert_eq!(workflow.confirm(), Err(BatchWarning::NothingToConfirm));
    }

    #[test]
    fn test_second_trigger_while_confirming_keeps_first() {
        let mut workflow = BatchWorkflow::new(DEFAULT);
        let selection = selection(&[StatusCode::Pending]);
        let first = BatchAction::ChangeStatus(ManualStatus::Completed);

        workflow.trigger(BatchRequest::selection(first), &selection).unwrap();
        let second = workflow.trigger(BatchRequest::selection(BatchAction::CancelAndRefund), &selection);

        assert_eq!(second, Err(BatchWarning::AlreadyConfirming(first)));
        assert_eq!(workflow.pending().unwrap().action, first);
    }

    #[test]
    fn test_submitting_is_exclusive() {
        let mut workflow = BatchWorkflow::new(DEFAULT);
        let selection = selection(&[StatusCode::Pending]);
        let action = BatchAction::ChangeStatus(ManualStatus::Completed);

        workflow.trigger(BatchRequest::selection(action), &selection).unwrap();
        let pending = workflow.confirm().unwrap();
        assert_eq!(pending.target, OrderTarget::Many(selection.ids()));
        assert!(workflow.is_busy());

        let single = BatchRequest::single(BatchAction::Resend, row(StatusCode::Fail));
        assert_eq!(workflow.trigger(single, &SelectionSet::new()), Err(BatchWarning::Busy));
        assert_eq!(workflow.confirm(), Err(BatchWarning::Busy));
    }

    #[test]
    fn test_settle_success() {
        let mut workflow = BatchWorkflow::new(DEFAULT);
        let selection = selection(&[StatusCode::Pending, StatusCode::Completed]);
        let action = BatchAction::ChangeStatus(ManualStatus::Completed);

        workflow.trigger(BatchRequest::selection(action), &selection).unwrap();
        workflow.confirm().unwrap();
        let outcome = workflow.settle(Ok(MutationEnvelope::ok()));

        assert!(matches!(outcome, BatchOutcome::Succeeded { count: 2, .. }));
        assert_eq!(workflow.phase(), WorkflowPhase::Settled);

        // Settled accepts new triggers
        assert!(workflow.trigger(BatchRequest::selection(action), &selection).is_ok());
    }

    #[test]
    fn test_settle_failure_uses_server_message_or_default() {
        let mut workflow = BatchWorkflow::new(DEFAULT);
        let selection = selection(&[StatusCode::Fail]);
        let request = BatchRequest::selection(BatchAction::Resend);

        workflow.trigger(request.clone(), &selection).unwrap();
        workflow.confirm().unwrap();
        let outcome = workflow.settle(Ok(MutationEnvelope::failed("Provider rejected")));
        assert_eq!(outcome.message(), "Provider rejected");
        assert_eq!(workflow.phase(), WorkflowPhase::Idle);

        workflow.trigger(request.clone(), &selection).unwrap();
        workflow.confirm().unwrap();
        let outcome = workflow.settle(Ok(MutationEnvelope::default()));
        assert!(!outcome.is_success());
        assert_eq!(outcome.message(), DEFAULT);

        workflow.trigger(request, &selection).unwrap();
        workflow.confirm().unwrap();
        let outcome = workflow.settle(Err(ServiceError::HttpStatus(502)));
        assert_eq!(outcome.message(), DEFAULT);
    }

    #[test]
    fn test_dismiss_only_affects_confirmation() {
        let mut workflow = BatchWorkflow::new(DEFAULT);
        let selection = selection(&[StatusCode::Fail]);
        workflow.trigger(BatchRequest::selection(BatchAction::Resend), &selection).unwrap();
        workflow.dismiss();
        assert_eq!(workflow.phase(), WorkflowPhase::Idle);

        workflow.trigger(BatchRequest::selection(BatchAction::Resend), &selection).unwrap();
        workflow.confirm().unwrap();
        workflow.dismiss();
        assert!(workflow.is_busy());
    }
}
