//! Simulation toolkit for the switching engine.
//!
//! Replays scripted scenarios against an `AutoSwitchController` on a mock
//! clock and generates seeded registration-flap soaks, so switching
//! behaviour can be checked without real modems or wall-clock waits.

pub mod flap;
pub mod replay;
pub mod scenario;
