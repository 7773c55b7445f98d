use std::future::Future;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Cancellable Task Slot
// ============================================================================
//
// Tracks the one "current" asynchronous cycle for a query surface. Starting
// a new cycle cancels the previous token, and late results are recognised
// by comparing their token id against the slot.
//
// Cancellation is cooperative: the superseded call is signalled, nobody
// waits for it to wind down.
//
// ============================================================================

/// Handle for one in-flight cycle.
#[derive(Debug, Clone)]
pub struct FetchToken {
    id: u64,
    signal: CancellationToken,
}

impl FetchToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Cancellation signal to hand to the collaborator being called.
    pub fn signal(&self) -> CancellationToken {
        self.signal.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.is_cancelled()
    }
}

#[derive(Debug, Default)]
pub struct TaskSlot {
    issued: u64,
    current: Option<FetchToken>,
}

impl TaskSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new cycle. The previous one, if any, is cancelled and returned.
    pub fn begin(&mut self) -> (FetchToken, Option<FetchToken>) {
        let superseded = self.cancel();

        self.issued += 1;
        let token = FetchToken {
            id: self.issued,
            signal: CancellationToken::new(),
        };
        self.current = Some(token.clone());

        (token, superseded)
    }

    /// Cancel the current cycle without starting a new one.
    pub fn cancel(&mut self) -> Option<FetchToken> {
        let previous = self.current.take()?;
        previous.signal.cancel();
        Some(previous)
    }

    pub fn is_current(&self, id: u64) -> bool {
        self.current.as_ref().is_some_and(|token| token.id == id)
    }

    /// Mark the cycle finished. Returns false if it was already superseded.
    pub fn complete(&mut self, id: u64) -> bool {
        if self.is_current(id) {
            self.current = None;
            true
        } else {
            false
        }
    }
}

/// Run `fut` until it finishes or `signal` fires. `None` means cancelled.
pub async fn until_cancelled<F>(signal: &CancellationToken, fut: F) -> Option<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = signal.cancelled() => None,
        output = fut => Some(output),
    }
}
