//! # Evaluation Scheduler
//!
//! Coalesces evaluation triggers into a single pending pass. While a pass is
//! pending, further requests are dropped: the pending pass reads the tracker
//! when it fires, so it already sees every update that arrived after it was
//! scheduled.
//!
//! Retry-triggered passes are delayed by `threshold * 2^min(k, cap)` where
//! `k` is the current consecutive validation failure count, bounded by
//! [`SwitchConfig::MAX_BACKOFF`].

use std::time::Duration;

use quanta::Instant;
use serde::Serialize;

use crate::config::SwitchConfig;

/// Why an evaluation pass was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationReason {
    RegistrationChanged,
    DisplayInfoChanged,
    SignalChanged,
    DefaultNetworkChanged,
    SettingsChanged,
    RetryValidation,
    SimLoaded,
    VoiceCallEnd,
}

/// A scheduled, not yet fired, evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationRequest {
    pub reason: EvaluationReason,
    pub requested_at: Instant,
    pub fire_at: Instant,
    /// Scheduling order across all timer slots of one controller.
    pub seq: u64,
}

/// `base * 2^min(failures, max_shift)`, saturating at `Duration::MAX`.
pub fn capped_backoff(base: Duration, failures: u32, max_shift: u32) -> Duration {
    let shift = failures.min(max_shift).min(31);
    base.saturating_mul(1u32 << shift)
}

/// `now + delay` without overflowing the clock. A delay that does not fit
/// falls back to [`SwitchConfig::MAX_BACKOFF`], then to `now`.
pub fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay)
        .or_else(|| now.checked_add(SwitchConfig::MAX_BACKOFF))
        .unwrap_or(now)
}

/// Single-slot evaluation scheduler.
#[derive(Debug, Clone)]
pub struct EvaluationScheduler {
    threshold: Duration,
    max_shift: u32,
    pending: Option<EvaluationRequest>,
}

impl EvaluationScheduler {
    pub fn new(threshold: Duration, max_shift: u32) -> Self {
        EvaluationScheduler {
            threshold,
            max_shift,
            pending: None,
        }
    }

    /// Apply new tuning. A pending pass keeps its original fire time.
    pub fn reconfigure(&mut self, threshold: Duration, max_shift: u32) {
        self.threshold = threshold;
        self.max_shift = max_shift;
    }

    /// Delay a pass for `reason` would get with `failures` consecutive
    /// validation failures on record.
    pub fn delay_for(&self, reason: EvaluationReason, failures: u32) -> Duration {
        match reason {
            EvaluationReason::RetryValidation => {
                capped_backoff(self.threshold, failures, self.max_shift)
                    .min(SwitchConfig::MAX_BACKOFF)
            }
            _ => Duration::ZERO,
        }
    }

    /// Schedule a pass unless one is already pending. Returns true if a new
    /// pass was scheduled.
    pub fn request(
        &mut self,
        reason: EvaluationReason,
        now: Instant,
        failures: u32,
        seq: u64,
    ) -> bool {
        if self.pending.is_some() {
            return false;
        }
        let delay = self.delay_for(reason, failures);
        self.pending = Some(EvaluationRequest {
            reason,
            requested_at: now,
            fire_at: deadline_after(now, delay),
            seq,
        });
        true
    }

    pub fn pending(&self) -> Option<&EvaluationRequest> {
        self.pending.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.fire_at)
    }

    /// Remove and return the pending pass if it is due at `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<EvaluationRequest> {
        match self.pending {
            Some(p) if p.fire_at <= now => self.pending.take(),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quanta::Clock;

    const THRESHOLD: Duration = Duration::from_millis(5000);

    // ─── Backoff ────────────────────────────────────────────────────────

    #[test]
    fn backoff_doubles_until_cap() {
        let cap = 3;
        let delays: Vec<Duration> = (0..6).map(|k| capped_backoff(THRESHOLD, k, cap)).collect();
        assert_eq!(delays[0], THRESHOLD);
        assert_eq!(delays[1], THRESHOLD * 2);
        assert_eq!(delays[2], THRESHOLD * 4);
        assert_eq!(delays[3], THRESHOLD * 8);
        assert_eq!(delays[4], THRESHOLD * 8);
        assert_eq!(delays[5], THRESHOLD * 8);
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn backoff_never_overflows() {
        let huge = capped_backoff(Duration::MAX / 2, u32::MAX, u32::MAX);
        assert_eq!(huge, Duration::MAX);
    }

    #[test]
    fn retry_delay_is_bounded_at_max_shift() {
        let s = EvaluationScheduler::new(
            SwitchConfig::DEFAULT_STABILITY_THRESHOLD,
            SwitchConfig::HARD_MAX_BACKOFF_SHIFT,
        );
        for failures in [20, 30, 31, u32::MAX] {
            assert_eq!(
                s.delay_for(EvaluationReason::RetryValidation, failures),
                SwitchConfig::MAX_BACKOFF
            );
        }
    }

    #[test]
    fn deadline_never_overflows_clock() {
        let (clock, _mock) = Clock::mock();
        let now = clock.now();
        assert_eq!(deadline_after(now, Duration::MAX), now + SwitchConfig::MAX_BACKOFF);
        assert_eq!(deadline_after(now, THRESHOLD), now + THRESHOLD);

        let mut s = EvaluationScheduler::new(Duration::MAX, SwitchConfig::HARD_MAX_BACKOFF_SHIFT);
        assert!(s.request(EvaluationReason::RetryValidation, now, 31, 1));
        assert_eq!(s.next_deadline(), Some(now + SwitchConfig::MAX_BACKOFF));
    }

    // ─── Coalescing ─────────────────────────────────────────────────────

    #[test]
    fn second_request_is_dropped_while_pending() {
        let (clock, _mock) = Clock::mock();
        let now = clock.now();
        let mut s = EvaluationScheduler::new(THRESHOLD, 6);

        assert!(s.request(EvaluationReason::RegistrationChanged, now, 0, 1));
        assert!(!s.request(EvaluationReason::RetryValidation, now, 2, 2));

        let p = s.pending().unwrap();
        assert_eq!(p.reason, EvaluationReason::RegistrationChanged);
        assert_eq!(p.fire_at, now);
    }

    #[test]
    fn retry_request_is_delayed() {
        let (clock, mock) = Clock::mock();
        let start = clock.now();
        let mut s = EvaluationScheduler::new(THRESHOLD, 6);
        s.request(EvaluationReason::RetryValidation, start, 2, 1);

        assert_eq!(s.next_deadline(), Some(start + THRESHOLD * 4));
        mock.increment(THRESHOLD * 3);
        assert!(s.take_due(clock.now()).is_none());
        mock.increment(THRESHOLD);
        let fired = s.take_due(clock.now()).unwrap();
        assert_eq!(fired.reason, EvaluationReason::RetryValidation);
        assert!(!s.is_pending());
    }

    #[test]
    fn new_request_accepted_after_fire() {
        let (clock, _mock) = Clock::mock();
        let now = clock.now();
        let mut s = EvaluationScheduler::new(THRESHOLD, 6);
        s.request(EvaluationReason::SimLoaded, now, 0, 1);
        assert!(s.take_due(now).is_some());
        assert!(s.request(EvaluationReason::VoiceCallEnd, now, 0, 2));
    }
}
