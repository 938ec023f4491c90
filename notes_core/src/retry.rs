//! Linear backoff shared by the broker bootstrap and the database connect
//! loop.

use std::time::Duration;

use tokio_retry::{Action, Condition, RetryIf};
use tokio_util::sync::CancellationToken;

/// Waits `initial`, then grows each wait by `increment`, and stops once the
/// next wait would reach `max_delay`.
///
/// The defaults wait 1, 4, 7, 10, 13, 16 and 19 seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    next: Duration,
    increment: Duration,
    max_delay: Duration,
}

impl LinearBackoff {
    pub const fn new(initial: Duration, increment: Duration, max_delay: Duration) -> Self {
        Self {
            next: initial,
            increment,
            max_delay,
        }
    }

    pub fn from_millis(initial_ms: u64, increment_ms: u64, max_delay_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(initial_ms),
            Duration::from_millis(increment_ms),
            Duration::from_millis(max_delay_ms),
        )
    }
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(1),
            Duration::from_secs(3),
            Duration::from_secs(20),
        )
    }
}

impl Iterator for LinearBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.next >= self.max_delay {
            return None;
        }
        let delay = self.next;
        self.next = self.next.saturating_add(self.increment);
        Some(delay)
    }
}

/// Runs `action` under `backoff` while `condition` accepts the error,
/// abandoning the attempt as soon as `token` is cancelled.
///
/// Returns `None` on cancellation, otherwise the final attempt's result.
pub async fn retry_until_cancelled<A, C>(
    token: &CancellationToken,
    backoff: LinearBackoff,
    action: A,
    condition: C,
) -> Option<Result<A::Item, A::Error>>
where
    A: Action,
    C: Condition<A::Error>,
{
    if token.is_cancelled() {
        return None;
    }
    tokio::select! {
        biased;
        () = token.cancelled() => None,
        result = RetryIf::spawn(backoff, action, condition) => Some(result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_default_schedule() {
        let waits: Vec<u64> = LinearBackoff::default().map(|d| d.as_secs()).collect();
        assert_eq!(waits, vec![1, 4, 7, 10, 13, 16, 19]);
        assert_eq!(waits.iter().sum::<u64>(), 70);
    }

    #[test]
    fn test_initial_at_ceiling_never_waits() {
        let mut backoff = LinearBackoff::from_millis(500, 100, 500);
        assert_eq!(backoff.next(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_two_failures() {
        let attempts = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();
        let started = tokio::time::Instant::now();

        let result = retry_until_cancelled(
            &token,
            LinearBackoff::default(),
            || {
                let attempts = attempts.clone();
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("refused")
                    } else {
                        Ok("connected")
                    }
                }
            },
            |_: &&str| true,
        )
        .await;

        assert_eq!(result, Some(Ok("connected")));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_with_last_error() {
        let token = CancellationToken::new();
        let result: Option<Result<(), &str>> = retry_until_cancelled(
            &token,
            LinearBackoff::from_millis(10, 10, 40),
            || async { Err("still down") },
            |_: &&str| true,
        )
        .await;

        assert_eq!(result, Some(Err("still down")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_condition_stops_retrying() {
        let attempts = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();
        let result: Option<Result<(), &str>> = retry_until_cancelled(
            &token,
            LinearBackoff::default(),
            || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err("fatal")
                }
            },
            |e: &&str| *e != "fatal",
        )
        .await;

        assert_eq!(result, Some(Err("fatal")));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_backoff() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            canceller.cancel();
        });

        let result: Option<Result<(), &str>> = retry_until_cancelled(
            &token,
            LinearBackoff::default(),
            || async { Err("refused") },
            |_: &&str| true,
        )
        .await;

        assert_eq!(result, None);
    }
}
