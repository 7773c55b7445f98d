use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

// ============================================================================
// Trailing-Edge Debounce
// ============================================================================
//
// Every call restarts the quiet period. Only the last call within a burst
// fires, once `delay` has passed without another call.
//
// Each call gets a generation number. The fire callback receives it so the
// receiver can drop a tick that was already in flight when newer input
// arrived (`is_current`).
//
// ============================================================================

pub struct Debouncer {
    delay: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Restart the timer. `fire` runs after the quiet period unless
    /// superseded by another call or `cancel`.
    pub fn call<F>(&mut self, fire: F) -> u64
    where
        F: FnOnce(u64) + Send + 'static,
    {
        let restarted = self.abort_pending();
        self.generation += 1;
        let generation = self.generation;
        let delay = self.delay;

        tracing::trace!(generation, restarted, delay_ms = delay.as_millis() as u64, "Debounce timer armed");

        self.pending = Some(tokio::spawn(async move {
            sleep(delay).await;
            fire(generation);
        }));

        generation
    }

    /// Drop any pending tick and retire the current generation, so a tick
    /// that already fired but was not handled yet reads as stale. Returns
    /// whether one was still waiting.
    pub fn cancel(&mut self) -> bool {
        self.generation += 1;
        self.abort_pending()
    }

    fn abort_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }

    /// Whether `generation` belongs to the latest call.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_burst_fires_once_with_last_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(Duration::from_millis(800));

        for _ in 0..3 {
            let tx = tx.clone();
            debouncer.call(move |generation| {
                let _ = tx.send(generation);
            });
            advance(Duration::from_millis(300)).await;
        }

        // 300ms after the last call: still quiet
        assert!(rx.try_recv().is_err());

        sleep(Duration::from_millis(600)).await;
        assert_eq!(rx.try_recv().unwrap(), 3);
        assert!(rx.try_recv().is_err());
        assert!(debouncer.is_current(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_calls_each_fire() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));

        for _ in 0..2 {
            let tx = tx.clone();
            debouncer.call(move |generation| {
                let _ = tx.send(generation);
            });
            sleep(Duration::from_millis(150)).await;
        }

        assert_eq!(rx.try_recv().unwrap(), 1);
        assert_eq!(rx.try_recv().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_fire() {
        let (tx, mut rx) = mpsc::unbounded_channel::<u64>();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));

        debouncer.call(move |generation| {
            let _ = tx.send(generation);
        });
        assert!(debouncer.is_pending());
        assert!(debouncer.cancel());

        sleep(Duration::from_millis(200)).await;
        assert!(rx.try_recv().is_err());
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_detected() {
        let mut debouncer = Debouncer::new(Duration::from_millis(50));
        let first = debouncer.call(|_| {});
        let second = debouncer.call(|_| {});

        assert!(!debouncer.is_current(first));
        assert!(debouncer.is_current(second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_retires_fired_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(Duration::from_millis(50));

        debouncer.call(move |generation| {
            let _ = tx.send(generation);
        });
        sleep(Duration::from_millis(100)).await;

        // Fired, but the receiver has not handled it yet
        let fired = rx.try_recv().unwrap();
        assert!(debouncer.is_current(fired));

        debouncer.cancel();
        assert!(!debouncer.is_current(fired));
    }
}
