//! Collaborator seams.
//!
//! [`CandidateDirectory`] is what the engine reads about the device's
//! current subscription layout. [`SwitchExecutor`] receives the engine's
//! commands; every call is fire-and-forget, and validation outcomes come
//! back later as [`SwitchEvent::ValidationResult`](crate::controller::SwitchEvent).

use std::sync::Arc;

use crate::candidate::CandidateId;
use crate::scheduler::EvaluationReason;

/// Read-only view of which candidate is default and which carries data.
pub trait CandidateDirectory: Send + Sync {
    fn active_candidate_id(&self) -> CandidateId;
    fn default_candidate_id(&self) -> CandidateId;
    fn is_subscription_active(&self, id: CandidateId) -> bool;
    fn active_candidate_count(&self) -> usize;
}

/// Commands issued by the engine.
pub trait SwitchExecutor: Send + Sync {
    /// Probe `target` (when `need_validation`) and switch to it. The result
    /// must be reported back whether or not a probe ran.
    fn request_validation(&self, target: CandidateId, need_validation: bool);
    /// Switch to `target` now, skipping validation.
    fn request_immediate_switch(&self, target: CandidateId, reason: EvaluationReason);
    /// Abort any in-flight probe or switch started by `request_validation`.
    fn cancel_pending_validation(&self);
}

impl<T: CandidateDirectory + ?Sized> CandidateDirectory for Arc<T> {
    fn active_candidate_id(&self) -> CandidateId {
        (**self).active_candidate_id()
    }
    fn default_candidate_id(&self) -> CandidateId {
        (**self).default_candidate_id()
    }
    fn is_subscription_active(&self, id: CandidateId) -> bool {
        (**self).is_subscription_active(id)
    }
    fn active_candidate_count(&self) -> usize {
        (**self).active_candidate_count()
    }
}

impl<T: SwitchExecutor + ?Sized> SwitchExecutor for Arc<T> {
    fn request_validation(&self, target: CandidateId, need_validation: bool) {
        (**self).request_validation(target, need_validation)
    }
    fn request_immediate_switch(&self, target: CandidateId, reason: EvaluationReason) {
        (**self).request_immediate_switch(target, reason)
    }
    fn cancel_pending_validation(&self) {
        (**self).cancel_pending_validation()
    }
}
