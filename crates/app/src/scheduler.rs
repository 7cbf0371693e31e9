//! One-shot delayed cycle timer with a per-second countdown.
//! This module exists so at most one pending navigation cycle is ever armed.
//! It does not decide when to arm or whether a firing is still wanted; the state machine
//! does, through the generation number echoed back on fire.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

pub struct CycleTimer {
    fired: UnboundedSender<u64>,
    handle: Option<JoinHandle<()>>,
}

impl CycleTimer {
    /// Fired generations are sent on `fired`.
    pub fn new(fired: UnboundedSender<u64>) -> Self {
        Self { fired, handle: None }
    }

    /// Replaces any pending timer.
    pub fn arm(&mut self, generation: u64, delay: Duration) {
        self.cancel();
        let fired = self.fired.clone();
        self.handle = Some(tokio::spawn(async move {
            countdown(delay).await;
            debug!(generation, "cycle timer fired");
            // The receiver only goes away on shutdown.
            let _ = fired.send(generation);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for CycleTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn countdown(delay: Duration) {
    let mut remaining = delay;
    while !remaining.is_zero() {
        info!(remaining_secs = remaining.as_secs(), "next navigation cycle in");
        let tick = remaining.min(COUNTDOWN_TICK);
        sleep(tick).await;
        remaining -= tick;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio::time::{Instant, timeout};

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_the_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = CycleTimer::new(tx);
        let start = Instant::now();

        timer.arm(3, Duration::from_secs(12));
        assert!(timer.is_armed());
        assert_eq!(rx.recv().await, Some(3));
        assert!(start.elapsed() >= Duration::from_secs(12));
        assert!(timeout(Duration::from_secs(60), rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_during_countdown_suppresses_the_cycle() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = CycleTimer::new(tx);

        timer.arm(1, Duration::from_secs(10));
        sleep(Duration::from_millis(4_500)).await;
        timer.cancel();
        assert!(!timer.is_armed());
        assert!(timeout(Duration::from_secs(60), rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_the_pending_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = CycleTimer::new(tx);

        timer.arm(1, Duration::from_secs(10));
        timer.arm(2, Duration::from_secs(3));
        assert_eq!(rx.recv().await, Some(2));
        assert!(timeout(Duration::from_secs(60), rx.recv()).await.is_err());
    }
}
