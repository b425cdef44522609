//! crates/support_chat_core/src/retry.rs
//!
//! The single retry policy shared by every outbound model and vector-search call.

use crate::domain::Category;
use crate::ports::PortResult;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// Runs `operation` until it succeeds, fails with a non-transient error, or the
/// policy's attempts are exhausted. The last error is returned on exhaustion.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, name: &str, mut operation: F) -> PortResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PortResult<T>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                warn!(operation = name, attempt, error = %e, "Provider call failed, retrying");
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Drives the classifier: each attempt returns raw model output. Empty or
/// `unknown` output and errors all count as failed attempts. Never fails; gives
/// `None` once the attempts are used up.
pub async fn classify_with_retries<F, Fut>(policy: &RetryPolicy, mut attempt_fn: F) -> Option<Category>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PortResult<String>>,
{
    for attempt in 1..=policy.max_attempts {
        match attempt_fn().await {
            Ok(raw) => match Category::from_model_output(&raw) {
                Some(category) => {
                    info!(attempt, category = %category, "Classified category");
                    return Some(category);
                }
                None => warn!(attempt, "Classifier returned no usable category"),
            },
            Err(e) => warn!(attempt, error = %e, "Error while classifying"),
        }
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }
    info!(
        attempts = policy.max_attempts,
        "All classification attempts failed; continuing without a category"
    );
    None
}
