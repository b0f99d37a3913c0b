//! Bounded, fixed-delay retry for classified failures.

use std::future::Future;

use log::{debug, warn};
use reqwest::Method;
use tokio_util::sync::CancellationToken;

use crate::config::RetryPolicy;
use crate::error::ApiError;

/// Methods whose repetition has no additional side effects.
pub fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE
    )
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// `policy.max_attempts` attempts have been made.
///
/// Cancellation is never retried, and cancelling `cancel` during the delay
/// between attempts ends the loop without waiting out the delay.
pub async fn with_retry<F, Fut, T>(
    operation_name: &str,
    policy: RetryPolicy,
    cancel: Option<&CancellationToken>,
    operation: F,
) -> Result<T, ApiError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_retryable() {
                    debug!("{}: non-retryable error: {}", operation_name, e);
                    return Err(e);
                }

                if attempt >= max_attempts {
                    debug!(
                        "{}: giving up after {} attempt(s): {}",
                        operation_name, attempt, e
                    );
                    return Err(e);
                }

                warn!(
                    "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                    operation_name,
                    attempt,
                    max_attempts,
                    e,
                    policy.delay.as_millis()
                );
                match cancel {
                    Some(token) => {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => {
                                debug!("{}: cancelled while waiting to retry", operation_name);
                                return Err(ApiError::cancelled());
                            }
                            _ = tokio::time::sleep(policy.delay) => {}
                        }
                    }
                    None => tokio::time::sleep(policy.delay).await,
                }
                attempt += 1;
            }
        }
    }
}
