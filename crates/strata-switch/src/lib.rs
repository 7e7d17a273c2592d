//! # Strata Switch
//!
//! Automatic data-link switching between cellular modems. Decides which
//! subscription should carry data while the default one is out of service,
//! debounces every decision through a stability window, validates the
//! target before committing, and bounds retries with capped exponential
//! backoff.
//!
//! The [`controller::AutoSwitchController`] is a synchronous state machine;
//! [`runtime::AutoSwitchRuntime`] runs one on a dedicated worker thread and
//! accepts events from any thread.

pub mod candidate;
pub mod config;
pub mod controller;
pub mod decision;
pub mod error;
pub mod executor;
pub mod retry;
pub mod runtime;
pub mod scheduler;
pub mod stability;
pub mod tracker;

pub use candidate::{Candidate, CandidateId, DisplayInfo, RegistrationState, SignalLevel};
pub use config::SwitchConfig;
pub use controller::{AutoSwitchController, ControllerSnapshot, SwitchEvent};
pub use decision::SwitchDecision;
pub use error::SwitchError;
pub use executor::{CandidateDirectory, SwitchExecutor};
pub use scheduler::EvaluationReason;
