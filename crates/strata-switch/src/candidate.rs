//! # Candidates
//!
//! One record per data-capable attachment point (modem + subscription).
//! Records are owned by the [`SignalStatusTracker`](crate::tracker::SignalStatusTracker)
//! and mutated only from the controller's worker.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable small integer naming a modem slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CandidateId(pub u8);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for CandidateId {
    fn from(v: u8) -> Self {
        CandidateId(v)
    }
}

/// Network registration state as reported by the modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationState {
    #[default]
    NotRegistered,
    Searching,
    Home,
    Roaming,
    Denied,
}

impl RegistrationState {
    /// Registered on any network, home or roaming.
    pub fn is_in_service(self) -> bool {
        matches!(self, RegistrationState::Home | RegistrationState::Roaming)
    }
}

/// Radio technology descriptor. Opaque to the decision logic, kept for
/// diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DisplayInfo {
    pub network_type: String,
    pub override_type: Option<String>,
}

impl DisplayInfo {
    pub fn new(network_type: impl Into<String>) -> Self {
        DisplayInfo {
            network_type: network_type.into(),
            override_type: None,
        }
    }
}

/// Signal bars, 0..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct SignalLevel(u8);

impl SignalLevel {
    pub const MAX: u8 = 4;

    /// Out-of-range levels clamp to [`SignalLevel::MAX`].
    pub fn new(level: u8) -> Self {
        SignalLevel(level.min(Self::MAX))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// Per-candidate status record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub registration: RegistrationState,
    /// User's mobile-data toggle for this subscription.
    pub user_data_enabled: bool,
    /// Whether data may be carried on this subscription after an automatic
    /// switch (carrier/user policy).
    pub data_allowed: bool,
    pub display_info: DisplayInfo,
    pub signal_level: SignalLevel,
}

impl Candidate {
    pub fn new(id: CandidateId) -> Self {
        Candidate {
            id,
            registration: RegistrationState::NotRegistered,
            user_data_enabled: true,
            data_allowed: true,
            display_info: DisplayInfo::default(),
            signal_level: SignalLevel::default(),
        }
    }

    pub fn is_in_service(&self) -> bool {
        self.registration.is_in_service()
    }

    pub fn is_home(&self) -> bool {
        self.registration == RegistrationState::Home
    }

    /// Diagnostic desirability: signal bars while in service, else 0.
    pub fn score(&self) -> u8 {
        if self.is_in_service() {
            self.signal_level.get()
        } else {
            0
        }
    }
}
