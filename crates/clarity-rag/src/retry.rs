use std::future::Future;
use std::time::Duration;

use clarity_core::Result;

/// Run `op` up to `max_attempts` times, sleeping `delay` after each retryable
/// failure. Non-retryable errors and the last failure are returned unchanged.
pub async fn retry_fixed<T, F, Fut>(max_attempts: usize, delay: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                tracing::warn!(attempt, max_attempts, error = %e, "retrying after error");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clarity_core::{BackendFailure, Error};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn unreachable() -> Error {
        Error::GenerationBackend { kind: BackendFailure::Unreachable, message: "connection refused".into() }
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let out = retry_fixed(3, Duration::from_millis(1), || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 { Err(unreachable()) } else { Ok("done") }
        })
        .await;
        assert_eq!(out.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let out: Result<()> = retry_fixed(3, Duration::from_millis(1), || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(unreachable())
        })
        .await;
        assert!(out.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rejected_calls_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let out: Result<()> = retry_fixed(3, Duration::from_millis(1), || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::GenerationBackend { kind: BackendFailure::Rejected, message: "bad key".into() })
        })
        .await;
        assert!(out.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
