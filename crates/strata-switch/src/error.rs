//! Error type shared across the switching engine.

use crate::candidate::CandidateId;

/// Failures surfaced by the tracker, config loader and runtime handle.
///
/// None of these cross the controller's `handle` boundary: the controller
/// logs them and resolves the pass to `NoChange`.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SwitchError {
    #[error("unknown candidate {0}")]
    UnknownCandidate(CandidateId),

    #[error("default candidate {0} is not tracked")]
    MissingDefault(CandidateId),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("switch worker is not running")]
    Disconnected,
}
