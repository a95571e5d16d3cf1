//! Bounded exponential backoff for fallback phases.
//!
//! Transient failures are retried with a growing delay until the phase
//! deadline expires. Permanent failures and cancellation stop the loop at once.

use std::future::Future;
use std::time::Duration;

use backoff::future::retry_notify;
use backoff::{Error as BackoffError, ExponentialBackoff};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::OrchestratorConfig;
use crate::error::PhaseFailure;

/// Build the retry policy from configuration.
///
/// The policy itself never gives up; the phase deadline bounds it.
#[must_use]
pub fn policy(config: &OrchestratorConfig) -> ExponentialBackoff {
    ExponentialBackoff {
        current_interval: config.initial_backoff(),
        initial_interval: config.initial_backoff(),
        multiplier: config.backoff_multiplier,
        max_interval: config.max_backoff(),
        max_elapsed_time: None,
        ..ExponentialBackoff::default()
    }
}

/// Run `operation` until it succeeds, fails permanently, the phase deadline
/// expires or `cancel` fires.
///
/// Cancellation is checked before every attempt and interrupts a pending
/// backoff sleep.
///
/// # Errors
///
/// Returns the permanent failure, [`PhaseFailure::Cancelled`], or
/// [`PhaseFailure::TimedOut`] carrying the last transient error.
pub async fn retry_with_backoff<T, F, Fut>(
    config: &OrchestratorConfig,
    cancel: &CancellationToken,
    label: &str,
    mut operation: F,
) -> Result<T, PhaseFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PhaseFailure>>,
{
    let last_error: Mutex<Option<String>> = Mutex::new(None);

    let attempts = retry_notify(
        policy(config),
        || {
            let attempt = operation();
            async move {
                if cancel.is_cancelled() {
                    return Err(BackoffError::permanent(PhaseFailure::Cancelled));
                }
                attempt.await.map_err(|e| {
                    if e.is_permanent() {
                        BackoffError::permanent(e)
                    } else {
                        BackoffError::transient(e)
                    }
                })
            }
        },
        |err: PhaseFailure, wait: Duration| {
            warn!(
                phase = %label,
                error = %err,
                retry_in_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "Phase attempt failed, backing off"
            );
            *last_error.lock() = Some(err.to_string());
        },
    );

    let phase_timeout = config.phase_timeout();
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(PhaseFailure::Cancelled),
        result = tokio::time::timeout(phase_timeout, attempts) => match result {
            Ok(outcome) => outcome,
            Err(_) => Err(PhaseFailure::TimedOut {
                after: phase_timeout,
                last_error: last_error.lock().take(),
            }),
        },
    }
}
