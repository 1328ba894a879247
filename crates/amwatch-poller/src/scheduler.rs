//! Recurring poll trigger.
//!
//! The scheduler owns at most one background timer task. [`PollScheduler::arm`]
//! aborts whatever task exists and spawns a fresh one, so calling it again with
//! the same interval never leaves two timers running.
//!
//! Each tick runs on its own detached task. Aborting the timer on re-arm,
//! disarm or drop stops future ticks but never cancels a tick already in
//! progress. Overlap between ticks is the handler's concern.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use amwatch_poller::{PollScheduler, TickHandler};
//!
//! struct Hello;
//!
//! #[async_trait::async_trait]
//! impl TickHandler for Hello {
//!     async fn on_tick(&self) {
//!         println!("tick");
//!     }
//! }
//!
//! # async fn example() -> amwatch_core::Result<()> {
//! let scheduler = PollScheduler::new();
//! scheduler.on_tick(Arc::new(Hello));
//! scheduler.arm(60)?;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use amwatch_core::error::{AmwatchError, Result};

/// Smallest period the scheduler will fire at, in seconds.
pub const MIN_PERIOD_SECS: u64 = 30;

/// Delay before the first tick after arming.
pub const INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Work run on every tick.
#[async_trait]
pub trait TickHandler: Send + Sync {
    async fn on_tick(&self);
}

/// Period actually used for a configured interval.
pub fn effective_period(interval_secs: u64) -> Duration {
    Duration::from_secs(interval_secs.max(MIN_PERIOD_SECS))
}

/// Owner of the single recurring trigger.
pub struct PollScheduler {
    handler: Mutex<Option<Arc<dyn TickHandler>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    period: Mutex<Option<Duration>>,
    initial_delay: Duration,
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PollScheduler {
    pub fn new() -> Self {
        Self::with_initial_delay(INITIAL_DELAY)
    }

    pub fn with_initial_delay(initial_delay: Duration) -> Self {
        Self {
            handler: Mutex::new(None),
            task: Mutex::new(None),
            period: Mutex::new(None),
            initial_delay,
        }
    }

    /// Register the tick handler. Takes effect at the next [`arm`](Self::arm).
    pub fn on_tick(&self, handler: Arc<dyn TickHandler>) {
        *lock(&self.handler) = Some(handler);
    }

    /// Replace any running timer with one firing every `interval_secs`
    /// (floored at [`MIN_PERIOD_SECS`]). Returns the effective period.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(&self, interval_secs: u64) -> Result<Duration> {
        let handler = lock(&self.handler)
            .clone()
            .ok_or_else(|| AmwatchError::internal("scheduler armed without a tick handler"))?;
        let runtime = Handle::try_current()
            .map_err(|e| AmwatchError::internal(format!("scheduler needs a tokio runtime: {e}")))?;

        let period = effective_period(interval_secs);
        let start = Instant::now() + self.initial_delay;

        let mut task = lock(&self.task);
        if let Some(previous) = task.take() {
            previous.abort();
            debug!("Previous poll timer aborted");
        }

        *task = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let handler = handler.clone();
                tokio::spawn(async move { handler.on_tick().await });
            }
        }));
        *lock(&self.period) = Some(period);

        info!(
            requested_secs = interval_secs,
            period_secs = period.as_secs(),
            "Poll timer armed"
        );
        Ok(period)
    }

    /// Stop the timer, if any.
    pub fn disarm(&self) {
        if let Some(task) = lock(&self.task).take() {
            task.abort();
            info!("Poll timer disarmed");
        }
        *lock(&self.period) = None;
    }

    pub fn is_armed(&self) -> bool {
        lock(&self.task).as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Effective period of the running timer.
    pub fn period(&self) -> Option<Duration> {
        *lock(&self.period)
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    #[async_trait]
    impl TickHandler for Counter {
        async fn on_tick(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Counter {
        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// Handler whose ticks take a while to finish.
    #[derive(Default)]
    struct Slow {
        started: AtomicUsize,
        finished: AtomicUsize,
    }

    #[async_trait]
    impl TickHandler for Slow {
        async fn on_tick(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(5)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn advance(duration: Duration) {
        tokio::time::sleep(duration).await;
        tokio::task::yield_now().await;
    }

    #[test]
    fn test_effective_period_floor() {
        assert_eq!(effective_period(5), Duration::from_secs(30));
        assert_eq!(effective_period(30), Duration::from_secs(30));
        assert_eq!(effective_period(120), Duration::from_secs(120));
    }

    #[test]
    fn test_arm_without_handler_fails() {
        let scheduler = PollScheduler::new();
        assert!(scheduler.arm(60).is_err());
        assert!(!scheduler.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_after_initial_delay_then_every_period() {
        let counter = Arc::new(Counter::default());
        let scheduler = PollScheduler::new();
        scheduler.on_tick(counter.clone());

        let period = scheduler.arm(60).unwrap();
        assert_eq!(period, Duration::from_secs(60));
        assert_eq!(scheduler.period(), Some(period));
        assert!(scheduler.is_armed());

        advance(Duration::from_millis(500)).await;
        assert_eq!(counter.count(), 0);

        advance(Duration::from_secs(1)).await;
        assert_eq!(counter.count(), 1);

        advance(Duration::from_secs(60)).await;
        assert_eq!(counter.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_interval_is_floored() {
        let counter = Arc::new(Counter::default());
        let scheduler = PollScheduler::new();
        scheduler.on_tick(counter.clone());
        scheduler.arm(5).unwrap();

        advance(Duration::from_millis(1500)).await;
        assert_eq!(counter.count(), 1);

        advance(Duration::from_secs(10)).await;
        assert_eq!(counter.count(), 1);

        advance(Duration::from_secs(20)).await;
        assert_eq!(counter.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_timer() {
        let counter = Arc::new(Counter::default());
        let scheduler = PollScheduler::new();
        scheduler.on_tick(counter.clone());

        scheduler.arm(60).unwrap();
        scheduler.arm(60).unwrap();
        scheduler.arm(60).unwrap();

        advance(Duration::from_millis(1500)).await;
        assert_eq!(counter.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_stops_ticks() {
        let counter = Arc::new(Counter::default());
        let scheduler = PollScheduler::new();
        scheduler.on_tick(counter.clone());
        scheduler.arm(60).unwrap();
        scheduler.disarm();

        advance(Duration::from_secs(5)).await;
        assert_eq!(counter.count(), 0);
        assert!(!scheduler.is_armed());
        assert_eq!(scheduler.period(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_lets_running_tick_finish() {
        let slow = Arc::new(Slow::default());
        let scheduler = PollScheduler::new();
        scheduler.on_tick(slow.clone());
        scheduler.arm(60).unwrap();

        advance(Duration::from_millis(1500)).await;
        assert_eq!(slow.started.load(Ordering::SeqCst), 1);
        assert_eq!(slow.finished.load(Ordering::SeqCst), 0);

        scheduler.arm(120).unwrap();
        advance(Duration::from_secs(10)).await;

        // The interrupted tick and the first tick of the new timer both ran to the end
        assert_eq!(slow.started.load(Ordering::SeqCst), 2);
        assert_eq!(slow.finished.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_lets_running_tick_finish() {
        let slow = Arc::new(Slow::default());
        let scheduler = PollScheduler::new();
        scheduler.on_tick(slow.clone());
        scheduler.arm(60).unwrap();

        advance(Duration::from_millis(1500)).await;
        scheduler.disarm();
        drop(scheduler);

        advance(Duration::from_secs(10)).await;
        assert_eq!(slow.started.load(Ordering::SeqCst), 1);
        assert_eq!(slow.finished.load(Ordering::SeqCst), 1);
    }
}
