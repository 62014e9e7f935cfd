//! Backoff schedules shared by the retrying operations.

use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// First delays of the resolution and ask loops
pub const BACKOFF_SCHEDULE: [Duration; 3] =
    [Duration::from_millis(150), Duration::from_millis(450), Duration::from_millis(1000)];

/// Growth factor once the fixed schedule is used up
pub const BACKOFF_GROWTH: f64 = 1.75;

/// Attempt intervals of extraction
pub const EXTRACT_SCHEDULE: [Duration; 6] = [
    Duration::from_millis(150),
    Duration::from_millis(450),
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
    Duration::from_secs(8),
];

/// Delay sequence: the fixed schedule, then each delay 1.75 times the previous one
#[derive(Debug)]
pub struct Backoff {
    attempt: usize,
    current: Duration,
}

impl Backoff {
    pub fn new() -> Self {
        Self { attempt: 0, current: Duration::ZERO }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = match BACKOFF_SCHEDULE.get(self.attempt) {
            Some(delay) => *delay,
            None => self.current.mul_f64(BACKOFF_GROWTH),
        };
        self.attempt += 1;
        self.current = delay;
        delay
    }

    /// Sleep for the next delay minus the time the failed attempt already took, capped to `remaining`
    pub async fn wait(&mut self, attempt_took: Duration, remaining: Duration) {
        let delay = self.next_delay().saturating_sub(attempt_took).min(remaining);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Outcome of one attempt of [`attempt_with_backoff`]
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt<T> {
    /// A value was produced
    Done(T),
    /// Nothing yet, try again on the schedule
    Retry,
    /// Nothing, and trying again will not help
    GiveUp,
}

/// Run `op` on the extraction schedule until it yields a value, gives up or `timeout` elapses.
///
/// Errors from `op` end the loop immediately.
pub async fn attempt_with_backoff<T, F, Fut>(timeout: Duration, mut op: F) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Attempt<T>>>,
{
    let start = Instant::now();

    for interval in EXTRACT_SCHEDULE {
        if start.elapsed() >= timeout {
            return Ok(None);
        }

        let attempt_start = Instant::now();
        match op().await? {
            Attempt::Done(value) => return Ok(Some(value)),
            Attempt::GiveUp => return Ok(None),
            Attempt::Retry => {}
        }

        let remaining = timeout.saturating_sub(start.elapsed());
        let delay = interval.saturating_sub(attempt_start.elapsed()).min(remaining);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BrowserError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_backoff_schedule_then_growth() {
        let mut backoff = Backoff::new();
        let delays: Vec<u128> = (0..5).map(|_| backoff.next_delay().as_micros()).collect();
        assert_eq!(delays, vec![150_000, 450_000, 1_000_000, 1_750_000, 3_062_500]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_with_backoff_succeeds_on_third_try() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let start = Instant::now();

        let result = attempt_with_backoff(Duration::from_secs(10), move || async move {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BrowserError>(if call == 2 { Attempt::Done("done") } else { Attempt::Retry })
        })
        .await
        .unwrap();

        assert_eq!(result, Some("done"));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_with_backoff_respects_budget() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let start = Instant::now();

        let result: Option<()> = attempt_with_backoff(Duration::from_millis(1000), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BrowserError>(Attempt::Retry)
        })
        .await
        .unwrap();

        assert!(result.is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_with_backoff_zero_budget() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let result: Option<()> = attempt_with_backoff(Duration::ZERO, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BrowserError>(Attempt::Retry)
        })
        .await
        .unwrap();

        assert!(result.is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_with_backoff_stops_on_give_up() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let start = Instant::now();

        let result: Option<()> = attempt_with_backoff(Duration::from_secs(10), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BrowserError>(Attempt::GiveUp)
        })
        .await
        .unwrap();

        assert!(result.is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
