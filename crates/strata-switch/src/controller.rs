//! # Auto Switch Controller
//!
//! Owns the tracker, scheduler, stability gate and retry governor for one
//! device and processes every input through two entry points:
//!
//! - [`AutoSwitchController::handle`] for signal changes, validation
//!   results and config reloads;
//! - [`AutoSwitchController::poll_timers`] for elapsed evaluation and
//!   stability deadlines.
//!
//! The controller never blocks and never sleeps. The caller owns the
//! event loop (see [`crate::runtime`]) and must call `poll_timers` no later
//! than [`AutoSwitchController::next_deadline`].

use quanta::{Clock, Instant};
use serde::Serialize;

use crate::candidate::{Candidate, CandidateId, DisplayInfo, RegistrationState, SignalLevel};
use crate::config::SwitchConfig;
use crate::decision::{self, DecisionInputs, PendingAction, SwitchDecision};
use crate::error::SwitchError;
use crate::executor::{CandidateDirectory, SwitchExecutor};
use crate::retry::{RetryCountGovernor, RetryVerdict};
use crate::scheduler::{EvaluationReason, EvaluationScheduler};
use crate::stability::{GatePhase, ProposeOutcome, StabilityGate};
use crate::tracker::SignalStatusTracker;

/// Inputs to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchEvent {
    CandidateAdded(CandidateId),
    CandidateRemoved(CandidateId),
    /// Number of modem slots changed; slots `0..count` remain.
    ModemCountChanged(u8),
    SimLoaded(CandidateId),
    RegistrationChanged {
        id: CandidateId,
        state: RegistrationState,
    },
    DisplayInfoChanged {
        id: CandidateId,
        info: DisplayInfo,
    },
    SignalLevelChanged {
        id: CandidateId,
        level: SignalLevel,
    },
    UserDataEnabledChanged {
        id: CandidateId,
        enabled: bool,
    },
    DataAllowedChanged {
        id: CandidateId,
        allowed: bool,
    },
    /// System default network moved to or from a non-cellular transport.
    DefaultNetworkChanged {
        non_cellular: bool,
    },
    VoiceCallEnded,
    ValidationResult {
        success: bool,
    },
    ConfigReloaded(SwitchConfig),
}

/// Point-in-time view of controller state, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerSnapshot {
    pub enabled: bool,
    pub default_candidate: CandidateId,
    pub active_candidate: CandidateId,
    pub candidates: Vec<Candidate>,
    pub default_network_on_non_cellular: bool,
    pub pending_evaluation: Option<EvaluationReason>,
    pub gate: GatePhase,
    pub consecutive_failures: u32,
    pub max_retries: u32,
    pub last_decision: SwitchDecision,
    pub passes: u64,
}

pub struct AutoSwitchController<D, E> {
    config: SwitchConfig,
    clock: Clock,
    directory: D,
    executor: E,
    tracker: SignalStatusTracker,
    scheduler: EvaluationScheduler,
    gate: StabilityGate,
    retry: RetryCountGovernor,
    default_network_on_non_cellular: bool,
    last_decision: SwitchDecision,
    passes: u64,
    next_seq: u64,
}

impl<D: CandidateDirectory, E: SwitchExecutor> AutoSwitchController<D, E> {
    pub fn new(config: SwitchConfig, directory: D, executor: E) -> Self {
        Self::with_clock(config, Clock::new(), directory, executor)
    }

    pub fn with_clock(config: SwitchConfig, clock: Clock, directory: D, executor: E) -> Self {
        let threshold = config.stability_threshold.unwrap_or_default();
        AutoSwitchController {
            scheduler: EvaluationScheduler::new(threshold, config.max_backoff_shift),
            gate: StabilityGate::new(threshold),
            retry: RetryCountGovernor::new(config.max_retries),
            config,
            clock,
            directory,
            executor,
            tracker: SignalStatusTracker::new(),
            default_network_on_non_cellular: false,
            last_decision: SwitchDecision::StayOnDefault,
            passes: 0,
            next_seq: 0,
        }
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn config(&self) -> &SwitchConfig {
        &self.config
    }

    pub fn tracker(&self) -> &SignalStatusTracker {
        &self.tracker
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn gate(&self) -> &StabilityGate {
        &self.gate
    }

    pub fn scheduler(&self) -> &EvaluationScheduler {
        &self.scheduler
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.retry.consecutive_failures()
    }

    pub fn last_decision(&self) -> SwitchDecision {
        self.last_decision
    }

    /// Number of decision passes run so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Earliest pending timer, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.scheduler.next_deadline(), self.gate.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ─── Event entry point ──────────────────────────────────────────────

    /// Apply one input. Never fails: inconsistencies are logged and dropped.
    pub fn handle(&mut self, event: SwitchEvent) {
        match event {
            SwitchEvent::CandidateAdded(id) => {
                if self.tracker.upsert_candidate(id) {
                    tracing::info!(candidate = %id, "candidate added");
                }
            }
            SwitchEvent::CandidateRemoved(id) => {
                if self.tracker.remove_candidate(id).is_some() {
                    tracing::info!(candidate = %id, "candidate removed");
                    self.on_candidates_removed(&[id]);
                } else {
                    tracing::warn!(candidate = %id, "removal of untracked candidate ignored");
                }
            }
            SwitchEvent::ModemCountChanged(count) => {
                let removed = self.tracker.resize(count);
                tracing::info!(count, removed = ?removed, "modem count changed");
                self.on_candidates_removed(&removed);
            }
            SwitchEvent::SimLoaded(id) => {
                self.tracker.upsert_candidate(id);
                self.retry.on_environment_changed();
                self.request_evaluation(EvaluationReason::SimLoaded);
            }
            SwitchEvent::RegistrationChanged { id, state } => {
                let changed = self.tracker.on_registration_changed(id, state);
                if self.accept_change(changed) {
                    tracing::debug!(candidate = %id, ?state, "registration changed");
                    self.retry.on_environment_changed();
                    self.request_evaluation(EvaluationReason::RegistrationChanged);
                }
            }
            SwitchEvent::DisplayInfoChanged { id, info } => {
                let changed = self.tracker.on_display_info_changed(id, info);
                if self.accept_change(changed) {
                    self.request_evaluation(EvaluationReason::DisplayInfoChanged);
                }
            }
            SwitchEvent::SignalLevelChanged { id, level } => {
                let changed = self.tracker.on_signal_level_changed(id, level);
                if self.accept_change(changed) {
                    self.request_evaluation(EvaluationReason::SignalChanged);
                }
            }
            SwitchEvent::UserDataEnabledChanged { id, enabled } => {
                let changed = self.tracker.on_user_data_enabled_changed(id, enabled);
                if self.accept_change(changed) {
                    tracing::debug!(candidate = %id, enabled, "user data setting changed");
                    self.retry.on_environment_changed();
                    self.request_evaluation(EvaluationReason::SettingsChanged);
                }
            }
            SwitchEvent::DataAllowedChanged { id, allowed } => {
                let changed = self.tracker.on_data_allowed_changed(id, allowed);
                if self.accept_change(changed) {
                    tracing::debug!(candidate = %id, allowed, "data policy changed");
                    self.retry.on_environment_changed();
                    self.request_evaluation(EvaluationReason::SettingsChanged);
                }
            }
            SwitchEvent::DefaultNetworkChanged { non_cellular } => {
                if self.default_network_on_non_cellular != non_cellular {
                    self.default_network_on_non_cellular = non_cellular;
                    tracing::debug!(non_cellular, "default network transport changed");
                    self.retry.on_environment_changed();
                    self.request_evaluation(EvaluationReason::DefaultNetworkChanged);
                }
            }
            SwitchEvent::VoiceCallEnded => {
                self.request_evaluation(EvaluationReason::VoiceCallEnd);
            }
            SwitchEvent::ValidationResult { success } => self.on_validation_result(success),
            SwitchEvent::ConfigReloaded(config) => self.apply_config(config),
        }
    }

    // ─── Timer entry point ──────────────────────────────────────────────

    /// Fire every timer due at the current clock reading, in scheduling
    /// order. Returns the number of timers fired.
    pub fn poll_timers(&mut self) -> usize {
        let mut fired = 0;
        loop {
            let now = self.clock.now();
            let eval_due = self
                .scheduler
                .pending()
                .filter(|p| p.fire_at <= now)
                .map(|p| (p.fire_at, p.seq));
            let gate_due = self
                .gate
                .armed()
                .filter(|w| w.fire_at <= now)
                .map(|w| (w.fire_at, w.seq));

            let gate_first = match (eval_due, gate_due) {
                (None, None) => break,
                (Some(e), Some(g)) => g < e,
                (None, Some(_)) => true,
                (Some(_), None) => false,
            };

            if gate_first {
                if let Some(window) = self.gate.take_due(now) {
                    tracing::info!(
                        target_candidate = %window.target,
                        needs_validation = window.needs_validation,
                        "stability check passed, requesting validation"
                    );
                    self.executor
                        .request_validation(window.target, window.needs_validation);
                }
            } else if let Some(request) = self.scheduler.take_due(now) {
                tracing::debug!(reason = ?request.reason, "evaluating auto switch");
                self.run_pass();
            }
            fired += 1;
        }
        fired
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            enabled: self.config.is_enabled(),
            default_candidate: self.directory.default_candidate_id(),
            active_candidate: self.directory.active_candidate_id(),
            candidates: self.tracker.iter().cloned().collect(),
            default_network_on_non_cellular: self.default_network_on_non_cellular,
            pending_evaluation: self.scheduler.pending().map(|p| p.reason),
            gate: self.gate.phase(),
            consecutive_failures: self.retry.consecutive_failures(),
            max_retries: self.retry.max_retries(),
            last_decision: self.last_decision,
            passes: self.passes,
        }
    }

    // ─── Internal ───────────────────────────────────────────────────────

    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn accept_change(&self, changed: Result<bool, SwitchError>) -> bool {
        match changed {
            Ok(changed) => changed,
            Err(e) => {
                tracing::warn!(error = %e, "signal update ignored");
                false
            }
        }
    }

    fn request_evaluation(&mut self, reason: EvaluationReason) {
        let now = self.clock.now();
        let seq = self.next_seq();
        let failures = self.retry.consecutive_failures();
        if self.scheduler.request(reason, now, failures, seq) {
            tracing::trace!(?reason, "evaluation scheduled");
        } else {
            tracing::trace!(?reason, "evaluation already pending");
        }
    }

    fn run_pass(&mut self) {
        self.passes += 1;
        let default_id = self.directory.default_candidate_id();
        let active_id = self.directory.active_candidate_id();
        let eval = decision::evaluate(&DecisionInputs {
            tracker: &self.tracker,
            default_id,
            active_id,
            active_candidate_count: self.directory.active_candidate_count(),
            default_subscription_active: self.directory.is_subscription_active(default_id),
            default_network_on_non_cellular: self.default_network_on_non_cellular,
            stability_threshold: self.config.stability_threshold,
            require_ping_test: self.config.require_ping_test_before_switch,
        });
        self.last_decision = eval.decision;

        match eval.decision {
            SwitchDecision::SwitchToCandidate {
                target,
                needs_validation,
            } => self.propose(target, needs_validation),
            SwitchDecision::SwitchToDefault {
                immediate: Some(reason),
                ..
            } => {
                tracing::info!(
                    from = %active_id,
                    to = %default_id,
                    ?reason,
                    "switching back to default immediately"
                );
                self.cancel_pending_switch();
                self.executor.request_immediate_switch(default_id, reason);
            }
            SwitchDecision::SwitchToDefault {
                needs_validation,
                immediate: None,
            } => self.propose(default_id, needs_validation),
            SwitchDecision::NoChange | SwitchDecision::StayOnDefault => {
                if eval.pending == PendingAction::Cancel {
                    self.cancel_pending_switch();
                }
            }
        }
    }

    fn propose(&mut self, target: CandidateId, needs_validation: bool) {
        let now = self.clock.now();
        let seq = self.next_seq();
        match self.gate.propose(target, needs_validation, now, seq) {
            ProposeOutcome::Unchanged => {}
            ProposeOutcome::Armed { replaced } => {
                tracing::info!(
                    target_candidate = %target,
                    needs_validation,
                    replaced,
                    "stability window armed"
                );
                if replaced {
                    self.executor.cancel_pending_validation();
                }
            }
        }
    }

    fn cancel_pending_switch(&mut self) {
        self.retry.reset();
        if self.gate.cancel() {
            tracing::info!("pending switch cancelled");
            self.executor.cancel_pending_validation();
        }
    }

    fn on_candidates_removed(&mut self, removed: &[CandidateId]) {
        if removed.is_empty() {
            return;
        }
        self.retry.on_environment_changed();
        let window = self.gate.armed().or(self.gate.in_flight()).copied();
        if let Some(w) = window {
            if removed.contains(&w.target) {
                self.cancel_pending_switch();
            }
        }
    }

    fn on_validation_result(&mut self, success: bool) {
        let settled = self.gate.settle();
        if settled.is_none() {
            tracing::debug!(success, "validation result with no switch in flight");
        }
        if success {
            tracing::info!(target_candidate = ?settled.map(|w| w.target), "validation passed");
            self.retry.on_validation_succeeded();
            return;
        }
        match self.retry.on_validation_failed() {
            RetryVerdict::Retry { attempt } => {
                tracing::info!(
                    attempt = attempt + 1,
                    max_retries = self.retry.max_retries(),
                    "validation failed, retrying"
                );
                let now = self.clock.now();
                let seq = self.next_seq();
                self.scheduler
                    .request(EvaluationReason::RetryValidation, now, attempt, seq);
            }
            RetryVerdict::GiveUp => {
                tracing::info!(
                    max_retries = self.retry.max_retries(),
                    "validation failed, retry limit reached"
                );
            }
        }
    }

    fn apply_config(&mut self, config: SwitchConfig) {
        tracing::info!(
            enabled = config.is_enabled(),
            threshold_ms = config
                .stability_threshold
                .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
            require_ping_test = config.require_ping_test_before_switch,
            max_retries = config.max_retries,
            "config reloaded"
        );
        let threshold = config.stability_threshold.unwrap_or_default();
        self.scheduler
            .reconfigure(threshold, config.max_backoff_shift);
        self.gate.set_threshold(threshold);
        self.retry.set_max_retries(config.max_retries);
        let enabled = config.is_enabled();
        self.config = config;
        if enabled {
            self.request_evaluation(EvaluationReason::SettingsChanged);
        } else {
            self.scheduler.clear();
            self.cancel_pending_switch();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    const THRESHOLD: Duration = Duration::from_millis(5000);

    struct FixedDirectory {
        default: CandidateId,
        active: Mutex<CandidateId>,
        count: usize,
    }

    impl CandidateDirectory for FixedDirectory {
        fn active_candidate_id(&self) -> CandidateId {
            *self.active.lock().unwrap()
        }
        fn default_candidate_id(&self) -> CandidateId {
            self.default
        }
        fn is_subscription_active(&self, _id: CandidateId) -> bool {
            true
        }
        fn active_candidate_count(&self) -> usize {
            self.count
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Cmd {
        Validate(CandidateId, bool),
        Immediate(CandidateId, EvaluationReason),
        Cancel,
    }

    #[derive(Default)]
    struct LogExecutor {
        log: Mutex<Vec<Cmd>>,
    }

    impl LogExecutor {
        fn take(&self) -> Vec<Cmd> {
            std::mem::take(&mut *self.log.lock().unwrap())
        }
    }

    impl SwitchExecutor for LogExecutor {
        fn request_validation(&self, target: CandidateId, need_validation: bool) {
            self.log
                .lock()
                .unwrap()
                .push(Cmd::Validate(target, need_validation));
        }
        fn request_immediate_switch(&self, target: CandidateId, reason: EvaluationReason) {
            self.log.lock().unwrap().push(Cmd::Immediate(target, reason));
        }
        fn cancel_pending_validation(&self) {
            self.log.lock().unwrap().push(Cmd::Cancel);
        }
    }

    type Ctl = AutoSwitchController<FixedDirectory, LogExecutor>;

    fn setup() -> (Ctl, std::sync::Arc<quanta::Mock>) {
        let (clock, mock) = Clock::mock();
        let config = SwitchConfig {
            stability_threshold: Some(THRESHOLD),
            require_ping_test_before_switch: true,
            max_retries: 3,
            max_backoff_shift: 6,
        };
        let dir = FixedDirectory {
            default: CandidateId(0),
            active: Mutex::new(CandidateId(0)),
            count: 2,
        };
        let mut ctl = AutoSwitchController::with_clock(config, clock, dir, LogExecutor::default());
        ctl.handle(SwitchEvent::ModemCountChanged(2));
        for id in [0, 1] {
            ctl.handle(SwitchEvent::RegistrationChanged {
                id: CandidateId(id),
                state: RegistrationState::Home,
            });
        }
        ctl.poll_timers();
        (ctl, mock)
    }

    fn lose_default(ctl: &mut Ctl) {
        ctl.handle(SwitchEvent::RegistrationChanged {
            id: CandidateId(0),
            state: RegistrationState::NotRegistered,
        });
        ctl.poll_timers();
    }

    // ─── Coalescing ─────────────────────────────────────────────────────

    #[test]
    fn burst_of_triggers_runs_one_pass_with_latest_state() {
        let (mut ctl, _mock) = setup();
        let before = ctl.passes();

        ctl.handle(SwitchEvent::RegistrationChanged {
            id: CandidateId(0),
            state: RegistrationState::Searching,
        });
        ctl.handle(SwitchEvent::SignalLevelChanged {
            id: CandidateId(1),
            level: SignalLevel::new(3),
        });
        ctl.handle(SwitchEvent::RegistrationChanged {
            id: CandidateId(0),
            state: RegistrationState::Home,
        });
        ctl.handle(SwitchEvent::VoiceCallEnded);

        assert_eq!(ctl.poll_timers(), 1);
        assert_eq!(ctl.passes(), before + 1);
        // The pass saw default back on Home.
        assert_eq!(ctl.last_decision(), SwitchDecision::NoChange);
        assert!(ctl.gate().armed().is_none());
    }

    #[test]
    fn unchanged_registration_does_not_schedule() {
        let (mut ctl, _mock) = setup();
        ctl.handle(SwitchEvent::RegistrationChanged {
            id: CandidateId(1),
            state: RegistrationState::Home,
        });
        assert!(!ctl.scheduler().is_pending());
    }

    #[test]
    fn unknown_candidate_signal_is_ignored() {
        let (mut ctl, _mock) = setup();
        ctl.handle(SwitchEvent::RegistrationChanged {
            id: CandidateId(9),
            state: RegistrationState::Home,
        });
        assert!(!ctl.scheduler().is_pending());
        assert_eq!(ctl.tracker().len(), 2);
    }

    // ─── Stability gate ─────────────────────────────────────────────────

    #[test]
    fn switch_requested_after_stability_window() {
        let (mut ctl, mock) = setup();
        lose_default(&mut ctl);
        assert_eq!(
            ctl.last_decision(),
            SwitchDecision::SwitchToCandidate {
                target: CandidateId(1),
                needs_validation: true
            }
        );
        assert!(ctl.executor().take().is_empty());

        mock.increment(THRESHOLD);
        ctl.poll_timers();
        assert_eq!(
            ctl.executor().take(),
            vec![Cmd::Validate(CandidateId(1), true)]
        );
    }

    #[test]
    fn scenario_d_no_change_before_fire_suppresses_switch() {
        let (mut ctl, mock) = setup();
        lose_default(&mut ctl);

        mock.increment(Duration::from_millis(2000));
        ctl.handle(SwitchEvent::RegistrationChanged {
            id: CandidateId(0),
            state: RegistrationState::Home,
        });
        ctl.poll_timers();
        assert_eq!(ctl.last_decision(), SwitchDecision::NoChange);

        mock.increment(Duration::from_millis(3000));
        ctl.poll_timers();
        let cmds = ctl.executor().take();
        assert!(
            !cmds.iter().any(|c| matches!(c, Cmd::Validate(..) | Cmd::Immediate(..))),
            "no switch command expected, got {cmds:?}"
        );
        assert_eq!(cmds, vec![Cmd::Cancel]);
    }

    #[test]
    fn immediate_switch_bypasses_gate() {
        let (mut ctl, mock) = setup();
        *ctl.directory().active.lock().unwrap() = CandidateId(1);
        lose_default(&mut ctl);
        ctl.executor().take();

        ctl.handle(SwitchEvent::UserDataEnabledChanged {
            id: CandidateId(0),
            enabled: false,
        });
        ctl.poll_timers();
        assert_eq!(
            ctl.executor().take(),
            vec![Cmd::Immediate(
                CandidateId(0),
                EvaluationReason::SettingsChanged
            )]
        );
        mock.increment(THRESHOLD * 2);
        ctl.poll_timers();
        assert!(ctl.executor().take().is_empty());
    }

    // ─── Retry ──────────────────────────────────────────────────────────

    #[test]
    fn validation_failure_retries_with_backoff() {
        let (mut ctl, mock) = setup();
        lose_default(&mut ctl);
        mock.increment(THRESHOLD);
        ctl.poll_timers();
        ctl.executor().take();

        ctl.handle(SwitchEvent::ValidationResult { success: false });
        assert_eq!(ctl.consecutive_failures(), 1);
        let pending = *ctl.scheduler().pending().unwrap();
        assert_eq!(pending.reason, EvaluationReason::RetryValidation);
        assert_eq!(pending.fire_at - pending.requested_at, THRESHOLD);

        // Retry pass re-arms the gate, which fires one threshold later.
        mock.increment(THRESHOLD);
        ctl.poll_timers();
        assert!(ctl.gate().armed().is_some());
        mock.increment(THRESHOLD);
        ctl.poll_timers();
        assert_eq!(
            ctl.executor().take(),
            vec![Cmd::Validate(CandidateId(1), true)]
        );

        ctl.handle(SwitchEvent::ValidationResult { success: false });
        let pending = *ctl.scheduler().pending().unwrap();
        assert_eq!(pending.fire_at - pending.requested_at, THRESHOLD * 2);
    }

    #[test]
    fn retry_ceiling_gives_up() {
        let (mut ctl, _mock) = setup();
        for expected in 1..=3 {
            ctl.handle(SwitchEvent::ValidationResult { success: false });
            assert_eq!(ctl.consecutive_failures(), expected);
            assert!(ctl.scheduler().is_pending());
            // Drop the scheduled retry so the next failure can schedule.
            ctl.scheduler.clear();
        }
        ctl.handle(SwitchEvent::ValidationResult { success: false });
        assert_eq!(ctl.consecutive_failures(), 0);
        assert!(!ctl.scheduler().is_pending());
    }

    #[test]
    fn validation_success_resets_failures() {
        let (mut ctl, _mock) = setup();
        ctl.handle(SwitchEvent::ValidationResult { success: false });
        ctl.handle(SwitchEvent::ValidationResult { success: true });
        assert_eq!(ctl.consecutive_failures(), 0);
    }

    // ─── Config & membership ────────────────────────────────────────────

    #[test]
    fn disabling_config_cancels_pending_switch() {
        let (mut ctl, mock) = setup();
        lose_default(&mut ctl);
        assert!(ctl.gate().armed().is_some());

        ctl.handle(SwitchEvent::ConfigReloaded(SwitchConfig {
            stability_threshold: None,
            ..ctl.config().clone()
        }));
        assert!(ctl.gate().armed().is_none());
        assert_eq!(ctl.executor().take(), vec![Cmd::Cancel]);

        mock.increment(THRESHOLD);
        ctl.poll_timers();
        assert!(ctl.executor().take().is_empty());
    }

    #[test]
    fn removing_target_cancels_pending_switch() {
        let (mut ctl, _mock) = setup();
        lose_default(&mut ctl);
        ctl.handle(SwitchEvent::CandidateRemoved(CandidateId(1)));
        assert!(ctl.gate().armed().is_none());
        assert_eq!(ctl.executor().take(), vec![Cmd::Cancel]);
    }

    #[test]
    fn snapshot_reports_state() {
        let (mut ctl, _mock) = setup();
        lose_default(&mut ctl);
        let snap = ctl.snapshot();
        assert!(snap.enabled);
        assert_eq!(snap.candidates.len(), 2);
        assert_eq!(
            snap.gate,
            GatePhase::Armed {
                target: CandidateId(1),
                needs_validation: true
            }
        );
        assert_eq!(snap.active_candidate, CandidateId(0));
    }
}
