//! Reconcile phase state machine.
//!
//! One reconcile cycle walks the phases in order. Any step may fail into
//! `Error`, and a finished cycle (`Ready` or `Error`) starts over at
//! `Initializing`.
//!
//! ```text
//!  (none) / Ready / Error
//!            │
//!            ▼
//!     ┌──────────────┐
//!     │ Initializing │───────────────────────────┐
//!     └──────┬───────┘                           │
//!            ▼                                   │
//!     ┌──────────────┐                           │
//!     │SMOReconciling│──────────────────────────┤
//!     └──────┬───────┘                           │
//!            ▼                                   │
//!     ┌──────────────┐                           │
//!     │O2Reconciling │──────────────────────────┤
//!     └──────┬───────┘                           │
//!            ▼                                   │
//!     ┌────────────────┐                         │
//!     │PoolReconciling │────────────────────────┤
//!     └──────┬─────────┘                         │
//!            ▼                                   ▼
//!     ┌──────────────────┐                 ┌──────────┐
//!     │InventoryUpdating │                 │  Error   │
//!     └──────┬───────────┘                 └──────────┘
//!            ▼
//!     ┌────────────────────┐
//!     │TelemetryCollecting │
//!     └──────┬─────────────┘
//!            ▼
//!     ┌──────────────┐
//!     │    Ready     │
//!     └──────────────┘
//! ```

use ocloud_store::ReconcilePhase;

use crate::error::{ControlError, Result};

/// Validates a phase transition and returns the target phase if valid.
///
/// # Errors
///
/// Returns `ControlError::InvalidTransition` if the transition is not allowed.
pub fn validate_transition(
    from: Option<ReconcilePhase>,
    to: ReconcilePhase,
) -> Result<ReconcilePhase> {
    if is_valid_transition(from, to) {
        Ok(to)
    } else {
        Err(ControlError::InvalidTransition { from, to })
    }
}

/// Check if a phase transition is allowed.
#[must_use]
pub const fn is_valid_transition(from: Option<ReconcilePhase>, to: ReconcilePhase) -> bool {
    use ReconcilePhase::{
        Error, Initializing, InventoryUpdating, O2Reconciling, PoolReconciling, Ready,
        SmoReconciling, TelemetryCollecting,
    };

    match from {
        None => matches!(to, Initializing),
        Some(from) => matches!(
            (from, to),
            (Ready | Error, Initializing)
                | (Initializing, SmoReconciling)
                | (SmoReconciling, O2Reconciling)
                | (O2Reconciling, PoolReconciling)
                | (PoolReconciling, InventoryUpdating)
                | (InventoryUpdating, TelemetryCollecting)
                | (TelemetryCollecting, Ready)
                | (
                    Initializing
                        | SmoReconciling
                        | O2Reconciling
                        | PoolReconciling
                        | InventoryUpdating
                        | TelemetryCollecting,
                    Error
                )
        ),
    }
}

/// Returns the list of valid target phases from the given phase.
#[must_use]
pub fn valid_transitions_from(phase: Option<ReconcilePhase>) -> Vec<ReconcilePhase> {
    use ReconcilePhase::{
        Error, Initializing, InventoryUpdating, O2Reconciling, PoolReconciling, Ready,
        SmoReconciling, TelemetryCollecting,
    };

    match phase {
        None | Some(Ready | Error) => vec![Initializing],
        Some(Initializing) => vec![SmoReconciling, Error],
        Some(SmoReconciling) => vec![O2Reconciling, Error],
        Some(O2Reconciling) => vec![PoolReconciling, Error],
        Some(PoolReconciling) => vec![InventoryUpdating, Error],
        Some(InventoryUpdating) => vec![TelemetryCollecting, Error],
        Some(TelemetryCollecting) => vec![Ready, Error],
    }
}

/// Returns true if the phase ends a cycle.
#[must_use]
pub const fn is_terminal(phase: ReconcilePhase) -> bool {
    matches!(phase, ReconcilePhase::Ready | ReconcilePhase::Error)
}
