//! Bounded exponential backoff for transient store failures.

use std::future::Future;
use std::time::Duration;

use crate::store::StoreError;

/// Run `operation` up to `attempts` times, sleeping `base_delay × 2ⁿ`
/// between tries. Only [`StoreError::Unavailable`] is considered
/// transient; conflicts and corrupt records surface immediately
/// (conflicts have their own retry loop at the read-modify-write
/// level).
pub async fn with_backoff<T, F, Fut>(
    attempts: u32,
    base_delay: Duration,
    mut operation: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut delay = base_delay;
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(StoreError::Unavailable(reason)) if attempt < attempts => {
                tracing::warn!(attempt, %reason, "transient store failure, backing off");
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(StoreError::Unavailable("flaky".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_when_attempts_exhausted() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::Unavailable("down".into())) }
        })
        .await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_conflict_is_not_retried_here() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::Conflict("location:u:d".into())) }
        })
        .await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
