use crate::rotation::MIN_CHANGE_DELAY;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Spawns the rotation timer task. One instance is active per rotation
/// session; it owns no wallpaper data, only a read view of the running flag
/// and interval plus a sender into the core event loop.
///
/// The sleep is clamped to at least `MIN_CHANGE_DELAY` so a misconfigured
/// interval cannot starve every apply on the rate limiter. Stopping is
/// cooperative: the flag is checked on wake, so the task may sleep out up to
/// one full interval after `stop()` before it exits.
pub fn spawn(
    running: Arc<AtomicBool>,
    interval_minutes: Arc<AtomicU64>,
    tick_tx: UnboundedSender<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Rotation timer started");

        loop {
            let minutes = interval_minutes.load(Ordering::SeqCst);
            let secs = minutes.saturating_mul(60).max(MIN_CHANGE_DELAY.as_secs());
            tokio::time::sleep(Duration::from_secs(secs)).await;

            if !running.load(Ordering::SeqCst) {
                debug!("Rotation stopped, timer exiting");
                break;
            }

            // Hand off to the core loop; never touch controller state here.
            if tick_tx.send(()).is_err() {
                debug!("Core loop gone, timer exiting");
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_tick_posted_each_interval() {
        let running = Arc::new(AtomicBool::new(true));
        let interval = Arc::new(AtomicU64::new(1));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = spawn(running.clone(), interval, tx);
        // Let the task register its sleep before moving the clock.
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_secs(60)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_ok());

        tokio::time::advance(Duration::from_secs(60)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_ok());

        running.store(false, Ordering::SeqCst);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_mid_sleep_exits_without_tick() {
        let running = Arc::new(AtomicBool::new(true));
        let interval = Arc::new(AtomicU64::new(1));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = spawn(running.clone(), interval, tx);

        // Flag flips while the timer is still asleep.
        running.store(false, Ordering::SeqCst);

        tokio::time::advance(Duration::from_secs(60)).await;
        handle.await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_clamped_to_rate_limit() {
        // Interval of 0 minutes must still sleep MIN_CHANGE_DELAY, not spin.
        let running = Arc::new(AtomicBool::new(true));
        let interval = Arc::new(AtomicU64::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = spawn(running.clone(), interval, tx);
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_secs(4)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_ok());

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_exits_when_core_loop_gone() {
        let running = Arc::new(AtomicBool::new(true));
        let interval = Arc::new(AtomicU64::new(1));
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let handle = spawn(running, interval, tx);
        tokio::time::advance(Duration::from_secs(60)).await;
        handle.await.unwrap();
    }
}
