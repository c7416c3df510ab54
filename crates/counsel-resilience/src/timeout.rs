//! Timeout management for provider calls.
//!
//! On expiry the inner future is dropped, so a late provider result is
//! discarded rather than applied.

use counsel_core::ProviderError;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Run a provider call bounded by `limit`.
///
/// Expiry is reported as [`ProviderError::Timeout`].
pub async fn with_timeout<F, T>(limit: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            let after_ms = limit.as_millis() as u64;
            debug!(after_ms, "Provider call abandoned after timeout");
            Err(ProviderError::timeout(after_ms))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fast_call_completes() {
        let result = with_timeout(Duration::from_millis(100), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok::<_, ProviderError>("done")
        })
        .await;
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out() {
        let result = with_timeout(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, ProviderError>("late")
        })
        .await;
        assert_eq!(result.unwrap_err(), ProviderError::timeout(50));
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result: Result<(), _> =
            with_timeout(Duration::from_secs(1), async { Err(ProviderError::auth("bad key")) }).await;
        assert_eq!(result.unwrap_err().kind(), counsel_core::ProviderErrorKind::AuthFailure);
    }
}
