//! WAIT_READY: the deployment readiness poll loop (§4.3).
//!
//! Pure observation — never mutates remote state, so running it twice on the
//! same application yields the same terminal classification modulo time.

use std::time::{Duration, Instant};

use crate::adapters::paas::PaasAdapter;
use crate::pipeline::StepOutcome;

const POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Polls `pollApplicationStatus` every 15s until a terminal state, or until
/// `budget` is exhausted. Transient poll errors are tolerated up to 50% of
/// the budget before they start eating into it like any other poll.
pub async fn wait_ready(paas: &PaasAdapter, app_uuid: &str, budget: Duration) -> StepOutcome {
    let deadline = Instant::now() + budget;
    let transient_budget = budget / 2;
    let mut transient_elapsed = Duration::ZERO;

    loop {
        match paas.poll_application_status(app_uuid).await {
            Ok(status) => {
                if status.state.is_ready() {
                    return StepOutcome::Completed {
                        details: format!("application is {}", status.status),
                    };
                }
                if status.state.is_terminal_failure() {
                    return StepOutcome::Failed {
                        details: "application entered a terminal non-running state".to_string(),
                        error: format!("status={}", status.status),
                    };
                }
                // anything else (building, starting, deploying, unknown): keep polling
            }
            Err(e) if e.is_transient() && transient_elapsed < transient_budget => {
                tracing::warn!(app_uuid, error = %e, "transient error polling application status, continuing");
                transient_elapsed += POLL_INTERVAL;
            }
            Err(e) => {
                tracing::warn!(app_uuid, error = %e, "non-transient error polling application status");
            }
        }

        if Instant::now() + POLL_INTERVAL >= deadline {
            return StepOutcome::TimedOut {
                details: "deployment may still be progressing".to_string(),
                error: format!("timeout after {}s waiting for readiness", budget.as_secs()),
            };
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}


