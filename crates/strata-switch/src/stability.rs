//! # Stability Gate
//!
//! Debounces switch proposals. A proposal must survive the stability
//! threshold without being cancelled or replaced before the controller asks
//! the executor to validate and switch.
//!
//! ```text
//!   Idle ──propose──▶ Armed ──fire_at elapsed──▶ Fired ──result──▶ Idle
//!                       │                          │
//!                       └──────── cancel ──────────┴──────────────▶ Idle
//! ```

use std::time::Duration;

use quanta::Instant;
use serde::Serialize;

use crate::candidate::CandidateId;
use crate::scheduler::deadline_after;

/// A proposal waiting out the stability threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilityWindow {
    pub target: CandidateId,
    pub needs_validation: bool,
    pub armed_at: Instant,
    pub fire_at: Instant,
    /// Scheduling order across all timer slots of one controller.
    pub seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Idle,
    Armed(StabilityWindow),
    /// Window elapsed, validation requested, result not yet reported.
    Fired(StabilityWindow),
}

/// Result of [`StabilityGate::propose`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposeOutcome {
    /// An identical proposal is already armed or in flight.
    Unchanged,
    /// A new window was armed. `replaced` is true if a different proposal
    /// was discarded to make room.
    Armed { replaced: bool },
}

/// Externally visible gate phase, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum GatePhase {
    Idle,
    Armed {
        target: CandidateId,
        needs_validation: bool,
    },
    Validating {
        target: CandidateId,
        needs_validation: bool,
    },
}

#[derive(Debug, Clone)]
pub struct StabilityGate {
    threshold: Duration,
    state: GateState,
}

impl StabilityGate {
    pub fn new(threshold: Duration) -> Self {
        StabilityGate {
            threshold,
            state: GateState::Idle,
        }
    }

    /// New threshold applies to windows armed from now on.
    pub fn set_threshold(&mut self, threshold: Duration) {
        self.threshold = threshold;
    }

    pub fn propose(
        &mut self,
        target: CandidateId,
        needs_validation: bool,
        now: Instant,
        seq: u64,
    ) -> ProposeOutcome {
        let replaced = match self.state {
            GateState::Armed(w) | GateState::Fired(w) => {
                if w.target == target && w.needs_validation == needs_validation {
                    return ProposeOutcome::Unchanged;
                }
                true
            }
            GateState::Idle => false,
        };
        self.state = GateState::Armed(StabilityWindow {
            target,
            needs_validation,
            armed_at: now,
            fire_at: deadline_after(now, self.threshold),
            seq,
        });
        ProposeOutcome::Armed { replaced }
    }

    /// Drop any armed or in-flight proposal. Returns true if there was one.
    pub fn cancel(&mut self) -> bool {
        let was_active = !matches!(self.state, GateState::Idle);
        self.state = GateState::Idle;
        was_active
    }

    /// If the armed window has elapsed, move to `Fired` and return it.
    pub fn take_due(&mut self, now: Instant) -> Option<StabilityWindow> {
        match self.state {
            GateState::Armed(w) if w.fire_at <= now => {
                self.state = GateState::Fired(w);
                Some(w)
            }
            _ => None,
        }
    }

    /// Validation outcome arrived for the in-flight proposal. Returns it.
    pub fn settle(&mut self) -> Option<StabilityWindow> {
        match self.state {
            GateState::Fired(w) => {
                self.state = GateState::Idle;
                Some(w)
            }
            _ => None,
        }
    }

    pub fn armed(&self) -> Option<&StabilityWindow> {
        match &self.state {
            GateState::Armed(w) => Some(w),
            _ => None,
        }
    }

    pub fn in_flight(&self) -> Option<&StabilityWindow> {
        match &self.state {
            GateState::Fired(w) => Some(w),
            _ => None,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.armed().map(|w| w.fire_at)
    }

    pub fn phase(&self) -> GatePhase {
        match self.state {
            GateState::Idle => GatePhase::Idle,
            GateState::Armed(w) => GatePhase::Armed {
                target: w.target,
                needs_validation: w.needs_validation,
            },
            GateState::Fired(w) => GatePhase::Validating {
                target: w.target,
                needs_validation: w.needs_validation,
            },
        }
    }
}
