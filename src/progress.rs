//! Cosmetic progress tracking and the delayed callbacks around a conversion.

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

pub const PROGRESS_START: u8 = 10;
pub const PROGRESS_STEP: u8 = 10;
pub const PROGRESS_CEILING: u8 = 90;
pub const PROGRESS_DONE: u8 = 100;

/// Handle to a spawned background callback.
///
/// `cancel` consumes the handle, and dropping it aborts the task, so a
/// callback can be cancelled at most once and never outlives its owner.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Runs `f` once after `delay`.
    pub fn after<F>(delay: Duration, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::spawn(async move {
            sleep(delay).await;
            f();
        })
    }

    pub fn spawn<Fut>(fut: Fut) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(fut),
        }
    }

    pub fn cancel(self) {
        // Drop aborts.
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Shared progress value, 0..=100.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    value: Arc<AtomicU8>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u8 {
        self.value.load(Ordering::SeqCst)
    }

    pub fn set(&self, value: u8) {
        self.value.store(value.min(PROGRESS_DONE), Ordering::SeqCst);
    }

    /// Adds one step unless the ceiling has been reached. Returns false at the ceiling.
    fn advance(&self) -> bool {
        self.value
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |p| {
                if p >= PROGRESS_CEILING {
                    None
                } else {
                    Some((p + PROGRESS_STEP).min(PROGRESS_CEILING))
                }
            })
            .is_ok()
    }

    /// Sets the start value and begins advancing it every `period`.
    pub fn start_ticker(&self, period: Duration) -> ScheduledTask {
        self.set(PROGRESS_START);
        let progress = self.clone();
        ScheduledTask::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if !progress.advance() {
                    break;
                }
            }
        })
    }
}

/// Renders `value` as a fixed-width text bar.
pub fn render_bar(value: u8, width: usize) -> String {
    let value = value.min(PROGRESS_DONE) as usize;
    let filled = value * width / PROGRESS_DONE as usize;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(width - filled),
        value
    )
}
