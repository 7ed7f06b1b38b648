//! Shared retry/backoff policy for the remote API adapters (§4.1).
//!
//! Transient errors and 5xx are retried up to 3 times with 500ms/1s/2s
//! backoff; anything else is returned immediately. Kept as a small
//! hand-rolled helper rather than a dedicated backoff crate since the
//! schedule is fixed and the whole thing is a dozen lines.

use std::future::Future;
use std::time::Duration;

use crate::error::OrchestratorError;

const BACKOFF: [Duration; 3] = [
    Duration::from_millis(500),
    Duration::from_secs(1),
    Duration::from_secs(2),
];

pub async fn with_retries<T, F, Fut>(op_name: &str, mut op: F) -> Result<T, OrchestratorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OrchestratorError>>,
{
    let mut attempt = 0usize;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < BACKOFF.len() => {
                let delay = BACKOFF[attempt];
                tracing::warn!(
                    op = op_name,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying transient backend error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
