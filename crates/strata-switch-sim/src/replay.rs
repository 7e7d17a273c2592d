//! Deterministic scenario replay on a mock clock.
//!
//! The controller runs exactly as it would on the worker thread, but time
//! only moves when the replay loop advances the mock clock to the next
//! event, timer deadline or simulated validation result.

use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use quanta::{Clock, Instant};
use serde::Serialize;
use strata_switch::{
    AutoSwitchController, CandidateDirectory, CandidateId, ControllerSnapshot, EvaluationReason,
    SwitchEvent, SwitchExecutor,
};

use crate::scenario::{Scenario, SimEvent, ValidationOutcome};

/// One line of the replay log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandRecord {
    pub at_ms: u64,
    #[serde(flatten)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    RequestValidation {
        target: CandidateId,
        probe: bool,
    },
    ImmediateSwitch {
        target: CandidateId,
        reason: EvaluationReason,
    },
    CancelValidation,
    ValidationResult {
        target: CandidateId,
        success: bool,
    },
}

impl Command {
    pub fn is_switch_request(&self) -> bool {
        matches!(
            self,
            Command::RequestValidation { .. } | Command::ImmediateSwitch { .. }
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub name: String,
    pub commands: Vec<CommandRecord>,
    pub final_active: CandidateId,
    pub passes: u64,
    pub snapshot: ControllerSnapshot,
}

// ─── Simulated collaborators ────────────────────────────────────────────

pub struct SimDirectory {
    default: CandidateId,
    active: Mutex<CandidateId>,
    present: Mutex<BTreeSet<CandidateId>>,
}

impl SimDirectory {
    pub fn new(default: CandidateId, active: CandidateId, candidates: u8) -> Self {
        SimDirectory {
            default,
            active: Mutex::new(active),
            present: Mutex::new((0..candidates).map(CandidateId).collect()),
        }
    }

    pub fn set_active(&self, id: CandidateId) {
        *lock(&self.active) = id;
    }

    pub fn insert(&self, id: CandidateId) {
        lock(&self.present).insert(id);
    }

    pub fn remove(&self, id: CandidateId) {
        lock(&self.present).remove(&id);
    }
}

impl CandidateDirectory for SimDirectory {
    fn active_candidate_id(&self) -> CandidateId {
        *lock(&self.active)
    }
    fn default_candidate_id(&self) -> CandidateId {
        self.default
    }
    fn is_subscription_active(&self, id: CandidateId) -> bool {
        lock(&self.present).contains(&id)
    }
    fn active_candidate_count(&self) -> usize {
        lock(&self.present).len()
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingValidation {
    target: CandidateId,
    due: Instant,
}

/// Executor that records every command and completes validations after a
/// fixed latency using a scripted list of outcomes.
pub struct SimExecutor {
    clock: Clock,
    start: Instant,
    latency: Duration,
    directory: Arc<SimDirectory>,
    outcomes: Mutex<VecDeque<ValidationOutcome>>,
    pending: Mutex<Option<PendingValidation>>,
    log: Mutex<Vec<CommandRecord>>,
}

impl SimExecutor {
    pub fn new(
        clock: Clock,
        latency: Duration,
        directory: Arc<SimDirectory>,
        outcomes: Vec<ValidationOutcome>,
    ) -> Self {
        let start = clock.now();
        SimExecutor {
            clock,
            start,
            latency,
            directory,
            outcomes: Mutex::new(outcomes.into()),
            pending: Mutex::new(None),
            log: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, command: Command) {
        let elapsed = self.clock.now().saturating_duration_since(self.start);
        let at_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(at_ms, ?command, "executor");
        lock(&self.log).push(CommandRecord { at_ms, command });
    }

    fn next_due(&self) -> Option<Instant> {
        lock(&self.pending).map(|p| p.due)
    }

    /// Complete the in-flight validation if due. Returns the event to feed
    /// back into the controller.
    fn complete_due(&self, now: Instant) -> Option<SwitchEvent> {
        let pending = {
            let mut slot = lock(&self.pending);
            match *slot {
                Some(p) if p.due <= now => slot.take(),
                _ => None,
            }
        }?;
        // Scripted outcomes run out into "pass".
        let outcome = lock(&self.outcomes)
            .pop_front()
            .unwrap_or(ValidationOutcome::Pass);
        let success = outcome == ValidationOutcome::Pass;
        if success {
            self.directory.set_active(pending.target);
        }
        self.record(Command::ValidationResult {
            target: pending.target,
            success,
        });
        Some(SwitchEvent::ValidationResult { success })
    }

    pub fn take_log(&self) -> Vec<CommandRecord> {
        std::mem::take(&mut *lock(&self.log))
    }
}

impl SwitchExecutor for SimExecutor {
    fn request_validation(&self, target: CandidateId, need_validation: bool) {
        self.record(Command::RequestValidation {
            target,
            probe: need_validation,
        });
        let latency = if need_validation {
            self.latency
        } else {
            Duration::ZERO
        };
        *lock(&self.pending) = Some(PendingValidation {
            target,
            due: self.clock.now() + latency,
        });
    }

    fn request_immediate_switch(&self, target: CandidateId, reason: EvaluationReason) {
        self.record(Command::ImmediateSwitch { target, reason });
        *lock(&self.pending) = None;
        self.directory.set_active(target);
    }

    fn cancel_pending_validation(&self) {
        self.record(Command::CancelValidation);
        *lock(&self.pending) = None;
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ─── Replay loop ────────────────────────────────────────────────────────

pub fn replay(scenario: &Scenario) -> ReplayReport {
    let (clock, mock) = Clock::mock();
    let start = clock.now();
    let directory = Arc::new(SimDirectory::new(
        scenario.default,
        scenario.active,
        scenario.candidates,
    ));
    let executor = Arc::new(SimExecutor::new(
        clock.clone(),
        scenario.validation_latency,
        directory.clone(),
        scenario.validation.clone(),
    ));
    let mut ctl = AutoSwitchController::with_clock(
        scenario.config.clone(),
        clock.clone(),
        directory.clone(),
        executor.clone(),
    );

    ctl.handle(SwitchEvent::ModemCountChanged(scenario.candidates));
    for event in &scenario.initial {
        ctl.handle(event.clone());
    }
    ctl.poll_timers();

    let end = start + scenario.end();
    let mut events = scenario.events.iter().peekable();

    loop {
        let next_event = events.peek().map(|e| start + e.at);
        let next = [next_event, ctl.next_deadline(), executor.next_due()]
            .into_iter()
            .flatten()
            .min();
        let Some(next) = next else { break };
        if next > end {
            break;
        }
        let now = clock.now();
        if next > now {
            mock.increment(next - now);
        }
        let now = clock.now();

        if let Some(result) = executor.complete_due(now) {
            ctl.handle(result);
        }
        while let Some(e) = events.next_if(|e| start + e.at <= now) {
            match &e.event {
                SimEvent::Controller(ev) => ctl.handle(ev.clone()),
                SimEvent::SimLoaded(id) => {
                    directory.insert(*id);
                    ctl.handle(SwitchEvent::SimLoaded(*id));
                }
                SimEvent::SimRemoved(id) => {
                    directory.remove(*id);
                    ctl.handle(SwitchEvent::CandidateRemoved(*id));
                }
            }
        }
        ctl.poll_timers();
    }

    tracing::info!(
        scenario = %scenario.name,
        passes = ctl.passes(),
        "replay finished"
    );

    ReplayReport {
        name: scenario.name.clone(),
        commands: executor.take_log(),
        final_active: directory.active_candidate_id(),
        passes: ctl.passes(),
        snapshot: ctl.snapshot(),
    }
}
