//! # Switch Decision
//!
//! Pure policy: given a tracker snapshot and the directory's view of which
//! candidate is default and which is active, decide whether data should
//! move. The checks run in a fixed order; the first one that applies wins.
//!
//! ## On the default candidate
//!
//! The first non-default candidate (ascending id) that is registered on its
//! home network is chosen when the default is out of service, the user has
//! mobile data on for the default, the candidate allows data, and the
//! system default network is cellular.
//!
//! ## On a backup candidate
//!
//! Settings violations and a non-cellular default network send data back
//! immediately, bypassing the stability gate. Losing home registration on
//! the backup, or the default regaining service, go back through the gate.

use std::time::Duration;

use serde::Serialize;

use crate::candidate::CandidateId;
use crate::error::SwitchError;
use crate::scheduler::EvaluationReason;
use crate::tracker::SignalStatusTracker;

/// Output of one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SwitchDecision {
    /// Initial state before any pass has run.
    StayOnDefault,
    SwitchToCandidate {
        target: CandidateId,
        needs_validation: bool,
    },
    /// `immediate` carries the reason forwarded to the executor when the
    /// switch bypasses the stability gate.
    SwitchToDefault {
        needs_validation: bool,
        immediate: Option<EvaluationReason>,
    },
    NoChange,
}

/// What the controller should do with pending switch state after a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Leave any armed window and retry state alone.
    Keep,
    /// Disarm the stability window, reset retry state, cancel validation.
    Cancel,
}

/// Full result of one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub decision: SwitchDecision,
    pub pending: PendingAction,
}

impl Evaluation {
    fn keep(decision: SwitchDecision) -> Self {
        Evaluation {
            decision,
            pending: PendingAction::Keep,
        }
    }

    fn cancel() -> Self {
        Evaluation {
            decision: SwitchDecision::NoChange,
            pending: PendingAction::Cancel,
        }
    }
}

/// Everything one pass reads.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInputs<'a> {
    pub tracker: &'a SignalStatusTracker,
    pub default_id: CandidateId,
    pub active_id: CandidateId,
    pub active_candidate_count: usize,
    pub default_subscription_active: bool,
    pub default_network_on_non_cellular: bool,
    /// `None` when automatic switching is disabled.
    pub stability_threshold: Option<Duration>,
    pub require_ping_test: bool,
}

/// Run one decision pass.
pub fn evaluate(inputs: &DecisionInputs<'_>) -> Evaluation {
    if inputs.stability_threshold.is_none() {
        tracing::debug!("auto switch disabled");
        return Evaluation::keep(SwitchDecision::NoChange);
    }
    if inputs.active_candidate_count < 2 || !inputs.default_subscription_active {
        tracing::debug!(
            active_count = inputs.active_candidate_count,
            default_active = inputs.default_subscription_active,
            "not a multi-candidate environment"
        );
        return Evaluation::keep(SwitchDecision::NoChange);
    }

    let tracker = inputs.tracker;
    let Some(default) = tracker.get(inputs.default_id) else {
        tracing::error!(
            error = %SwitchError::MissingDefault(inputs.default_id),
            "skipping pass"
        );
        return Evaluation::keep(SwitchDecision::NoChange);
    };

    if inputs.active_id == inputs.default_id {
        // Currently on default: look for the first usable backup.
        if default.is_in_service()
            || !default.user_data_enabled
            || inputs.default_network_on_non_cellular
        {
            return Evaluation::cancel();
        }
        // TODO: rank by Candidate::score once carrier scoring rules exist;
        // first home candidate wins for now.
        let target = tracker
            .iter()
            .filter(|c| c.id != inputs.default_id)
            .find(|c| c.is_home() && c.data_allowed);
        return match target {
            Some(c) => Evaluation::keep(SwitchDecision::SwitchToCandidate {
                target: c.id,
                needs_validation: inputs.require_ping_test,
            }),
            None => Evaluation::cancel(),
        };
    }

    // Currently on a backup.
    let backup = tracker.get(inputs.active_id);
    let backup_data_allowed = backup.is_some_and(|c| c.data_allowed);
    let backup_home = backup.is_some_and(|c| c.is_home());

    if !default.user_data_enabled || !backup_data_allowed {
        return Evaluation::keep(SwitchDecision::SwitchToDefault {
            needs_validation: false,
            immediate: Some(EvaluationReason::SettingsChanged),
        });
    }
    if inputs.default_network_on_non_cellular {
        return Evaluation::keep(SwitchDecision::SwitchToDefault {
            needs_validation: false,
            immediate: Some(EvaluationReason::DefaultNetworkChanged),
        });
    }
    if !backup_home {
        return Evaluation::keep(SwitchDecision::SwitchToDefault {
            needs_validation: false,
            immediate: None,
        });
    }
    if default.is_in_service() {
        return Evaluation::keep(SwitchDecision::SwitchToDefault {
            needs_validation: inputs.require_ping_test,
            immediate: None,
        });
    }
    Evaluation::cancel()
}
