//! # Signal Status Tracker
//!
//! Authoritative store of per-candidate registration, settings and signal
//! state. Every setter reports whether the stored value actually changed so
//! the controller can skip redundant evaluations.
//!
//! The tracker never schedules evaluation itself.

use std::collections::BTreeMap;

use crate::candidate::{Candidate, CandidateId, DisplayInfo, RegistrationState, SignalLevel};
use crate::error::SwitchError;

/// Candidate records keyed by id. Iteration is in ascending id order, which
/// the decision pass relies on for its first-match tie-break.
#[derive(Debug, Default, Clone)]
pub struct SignalStatusTracker {
    candidates: BTreeMap<CandidateId, Candidate>,
}

impl SignalStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `id`. An existing record is kept as-is.
    /// Returns true if the candidate was newly inserted.
    pub fn upsert_candidate(&mut self, id: CandidateId) -> bool {
        let mut inserted = false;
        self.candidates.entry(id).or_insert_with(|| {
            inserted = true;
            Candidate::new(id)
        });
        inserted
    }

    /// Stop tracking `id`, returning its last record.
    pub fn remove_candidate(&mut self, id: CandidateId) -> Option<Candidate> {
        self.candidates.remove(&id)
    }

    /// Track exactly the slots `0..count`. Retained records are preserved,
    /// records for slots at or above `count` are dropped.
    ///
    /// Returns the ids that were removed.
    pub fn resize(&mut self, count: u8) -> Vec<CandidateId> {
        let removed: Vec<CandidateId> = self
            .candidates
            .keys()
            .copied()
            .filter(|id| id.0 >= count)
            .collect();
        for id in &removed {
            self.candidates.remove(id);
        }
        for slot in 0..count {
            self.upsert_candidate(CandidateId(slot));
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn contains(&self, id: CandidateId) -> bool {
        self.candidates.contains_key(&id)
    }

    pub fn get(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates.get(&id)
    }

    /// Candidates in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.values()
    }

    pub fn is_in_service(&self, id: CandidateId) -> bool {
        self.candidates.get(&id).is_some_and(Candidate::is_in_service)
    }

    pub fn is_home(&self, id: CandidateId) -> bool {
        self.candidates.get(&id).is_some_and(Candidate::is_home)
    }

    pub fn score(&self, id: CandidateId) -> Option<u8> {
        self.candidates.get(&id).map(Candidate::score)
    }

    // ─── Change-detecting setters ───────────────────────────────────────

    pub fn on_registration_changed(
        &mut self,
        id: CandidateId,
        state: RegistrationState,
    ) -> Result<bool, SwitchError> {
        let c = self.get_mut(id)?;
        Ok(replace_if_changed(&mut c.registration, state))
    }

    pub fn on_display_info_changed(
        &mut self,
        id: CandidateId,
        info: DisplayInfo,
    ) -> Result<bool, SwitchError> {
        let c = self.get_mut(id)?;
        Ok(replace_if_changed(&mut c.display_info, info))
    }

    pub fn on_signal_level_changed(
        &mut self,
        id: CandidateId,
        level: SignalLevel,
    ) -> Result<bool, SwitchError> {
        let c = self.get_mut(id)?;
        Ok(replace_if_changed(&mut c.signal_level, level))
    }

    pub fn on_user_data_enabled_changed(
        &mut self,
        id: CandidateId,
        enabled: bool,
    ) -> Result<bool, SwitchError> {
        let c = self.get_mut(id)?;
        Ok(replace_if_changed(&mut c.user_data_enabled, enabled))
    }

    pub fn on_data_allowed_changed(
        &mut self,
        id: CandidateId,
        allowed: bool,
    ) -> Result<bool, SwitchError> {
        let c = self.get_mut(id)?;
        Ok(replace_if_changed(&mut c.data_allowed, allowed))
    }

    fn get_mut(&mut self, id: CandidateId) -> Result<&mut Candidate, SwitchError> {
        self.candidates
            .get_mut(&id)
            .ok_or(SwitchError::UnknownCandidate(id))
    }
}

fn replace_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
