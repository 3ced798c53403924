//! Bounded retry for transient backend failures

use crate::config::RetryPolicy;
use ssm_backend::BackendError;
use std::future::Future;
use tokio::time::sleep;
use tracing::{info, warn};

/// Run `operation` until it succeeds, fails permanently or runs out of
/// attempts
///
/// Only [`BackendError::Unavailable`] is retried; not-found and write
/// failures are returned immediately.
///
/// # Errors
/// Returns the last error of `operation`.
pub async fn retry<F, Fut, T>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, BackendError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!("{operation_name} succeeded after {attempt} attempts");
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                warn!(
                    "{operation_name} failed (attempt {attempt}/{}): {err}. Retrying in {:?}",
                    policy.max_attempts,
                    policy.backoff()
                );
                sleep(policy.backoff()).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = retry("get", &fast(3), move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(BackendError::Unavailable("busy".into()))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn attempts_are_bounded() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = retry("get", &fast(3), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(BackendError::Unavailable("busy".into()))
        })
        .await;
        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn not_found_is_never_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = retry("delete", &fast(3), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(BackendError::NotFound("/a".into()))
        })
        .await;
        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
