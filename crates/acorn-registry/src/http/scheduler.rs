//! Cooperative scheduling primitive used at every poll-and-yield point.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Future returned by [`Scheduler::next_tick`]
pub type TickFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Suspends the current task until the next scheduling tick
pub trait Scheduler: Send + Sync {
    fn next_tick(&self) -> TickFuture<'_>;
}

/// Tokio-backed scheduler.
///
/// Without an interval every tick is a plain `yield_now`, which hands control
/// back to the runtime once. With an interval each tick lasts one frame so an
/// idle connection is not polled in a tight loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameScheduler {
    interval: Option<Duration>,
}

impl FrameScheduler {
    /// Yield once per tick
    pub fn new() -> Self {
        Self { interval: None }
    }

    /// Sleep for one frame per tick
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval: (!interval.is_zero()).then_some(interval),
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }
}

impl Scheduler for FrameScheduler {
    fn next_tick(&self) -> TickFuture<'_> {
        match self.interval {
            Some(interval) => Box::pin(tokio::time::sleep(interval)),
            None => Box::pin(tokio::task::yield_now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_interval_means_yield() {
        assert_eq!(FrameScheduler::with_interval(Duration::ZERO).interval(), None);
        assert_eq!(
            FrameScheduler::with_interval(Duration::from_millis(5)).interval(),
            Some(Duration::from_millis(5))
        );
    }

    #[tokio::test]
    async fn test_ticks_complete() {
        FrameScheduler::new().next_tick().await;
        FrameScheduler::with_interval(Duration::from_millis(1))
            .next_tick()
            .await;
    }
}
