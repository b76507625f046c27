//! Race an in-flight operation against a polled liveness check
use crate::error::{GrepError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Await `operation`, checking `is_active` every `poll`.
///
/// Fails with [`GrepError::Stopped`] as soon as a check sees the run inactive.
/// The operation is dropped at that point and its result discarded. When the
/// operation settles first its result is returned as is.
pub async fn with_cancellation<F, T, A>(operation: F, is_active: A, poll: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
    A: Fn() -> bool,
{
    tokio::pin!(operation);
    let mut ticker = interval_at(Instant::now() + poll, poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            result = &mut operation => return result,

            _ = ticker.tick() => {
                if !is_active() {
                    return Err(GrepError::Stopped);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    const POLL: Duration = Duration::from_millis(100);

    #[tokio::test(start_paused = true)]
    async fn test_operation_settles_first() {
        let result = with_cancellation(async { Ok::<_, GrepError>(7) }, || true, POLL).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_operation_error_passes_through() {
        let result: Result<()> = with_cancellation(
            async { Err(GrepError::Host("boom".into())) },
            || true,
            POLL,
        )
        .await;
        assert!(matches!(result, Err(GrepError::Host(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactive_run_stops_slow_operation() {
        let active = Arc::new(AtomicBool::new(true));
        let flag = active.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            flag.store(false, Ordering::SeqCst);
        });

        let started = Instant::now();
        let result = with_cancellation(
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            },
            || active.load(Ordering::SeqCst),
            POLL,
        )
        .await;

        assert!(matches!(result, Err(GrepError::Stopped)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_operation_completes_while_active() {
        let result = with_cancellation(
            async {
                tokio::time::sleep(Duration::from_millis(550)).await;
                Ok("done")
            },
            || true,
            POLL,
        )
        .await;
        assert_eq!(result.unwrap(), "done");
    }
}
