use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::info;

/// Shared stop request. Raised by SIGINT once registered, or by `stop()`.
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    flag: Arc<AtomicBool>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_interrupt(&self) -> Result<()> {
        signal_hook::flag::register(signal_hook::SIGINT, Arc::clone(&self.flag))
            .context("Registering SIGINT handler")?;
        info!("Registered SIGINT handler");
        Ok(())
    }

    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration` in steps of at most `slice`.
    /// Returns false as soon as a stop is observed, true once the full
    /// duration has elapsed.
    pub fn sleep(&self, duration: Duration, slice: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let slice = if slice.as_nanos() == 0 {
            Duration::from_millis(1)
        } else {
            slice
        };
        loop {
            if self.is_stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(std::cmp::min(slice, deadline - now));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let stop = StopFlag::new();
        let other = stop.clone();
        assert!(!other.is_stopped());
        stop.stop();
        assert!(other.is_stopped());
    }

    #[test]
    fn sleep_runs_to_completion_when_not_stopped() {
        let stop = StopFlag::new();
        let started = Instant::now();
        assert!(stop.sleep(Duration::from_millis(30), Duration::from_millis(5)));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn sleep_returns_early_on_stop() {
        let stop = StopFlag::new();
        let remote = stop.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.stop();
        });
        let started = Instant::now();
        assert!(!stop.sleep(Duration::from_secs(10), Duration::from_millis(5)));
        assert!(started.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }

    #[test]
    fn sleep_with_zero_slice_still_terminates() {
        let stop = StopFlag::new();
        assert!(stop.sleep(Duration::from_millis(5), Duration::from_millis(0)));
    }
}
