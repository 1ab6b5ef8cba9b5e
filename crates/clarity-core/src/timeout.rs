use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

/// Await `fut`, failing with [`Error::Timeout`] once `deadline` elapses.
///
/// `None` waits indefinitely. Dropping the future on timeout only discards the
/// client side; a request already sent is not cancelled server-side.
pub async fn with_deadline<T, F>(operation: &'static str, deadline: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        None => fut.await,
        Some(after) => match tokio::time::timeout(after, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, ?after, "deadline exceeded");
                Err(Error::Timeout { operation, after })
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_fast_results() {
        let out = with_deadline("noop", Some(Duration::from_secs(1)), async { Ok(7) }).await;
        assert_eq!(out.expect("value"), 7);
    }

    #[tokio::test]
    async fn slow_futures_time_out() {
        let out: Result<()> = with_deadline("sleep", Some(Duration::from_millis(10)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(out, Err(Error::Timeout { operation: "sleep", .. })));
    }
}
