//! Scenario file format.
//!
//! ```toml
//! name = "default outage"
//! candidates = 2
//! validation = ["fail", "pass"]
//!
//! [config]
//! stability_threshold_ms = 5000
//!
//! [[initial]]
//! id = 0
//! registration = "home"
//!
//! [[events]]
//! at_ms = 1000
//! kind = "registration"
//! id = 0
//! state = "not_registered"
//! ```

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use strata_switch::config::SwitchConfigInput;
use strata_switch::{CandidateId, RegistrationState, SwitchConfig, SwitchEvent};

/// Outcome the simulated executor reports for one validation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Registration,
    UserData,
    DataAllowed,
    Signal,
    NonCellular,
    CallEnd,
    SimLoaded,
    SimRemoved,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScenarioInput {
    pub name: Option<String>,
    pub candidates: Option<u8>,
    pub default: Option<u8>,
    pub active: Option<u8>,
    pub validation: Vec<ValidationOutcome>,
    pub validation_latency_ms: Option<u64>,
    /// How long to keep running timers after the last event.
    pub tail_ms: Option<u64>,
    pub config: SwitchConfigInput,
    pub initial: Vec<InitialStateInput>,
    pub events: Vec<EventInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InitialStateInput {
    pub id: u8,
    pub registration: Option<RegistrationState>,
    pub user_data_enabled: Option<bool>,
    pub data_allowed: Option<bool>,
    pub signal_level: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventInput {
    pub at_ms: u64,
    pub kind: EventKind,
    pub id: Option<u8>,
    pub state: Option<RegistrationState>,
    pub enabled: Option<bool>,
    pub level: Option<u8>,
}

/// An event scheduled at an offset from scenario start.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEvent {
    pub at: Duration,
    pub event: SimEvent,
}

/// Scenario events. Membership changes are kept apart from plain
/// controller events because the simulated directory must see them too.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    Controller(SwitchEvent),
    SimLoaded(CandidateId),
    SimRemoved(CandidateId),
}

/// Validated scenario, ready to replay.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub candidates: u8,
    pub default: CandidateId,
    pub active: CandidateId,
    pub config: SwitchConfig,
    pub validation: Vec<ValidationOutcome>,
    pub validation_latency: Duration,
    pub tail: Duration,
    pub initial: Vec<SwitchEvent>,
    pub events: Vec<TimedEvent>,
}

impl Scenario {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let parsed: ScenarioInput = toml::from_str(input)
            .map_err(|e| anyhow::anyhow!("Invalid scenario TOML: {}", e))?;
        parsed.resolve()
    }

    pub fn end(&self) -> Duration {
        self.events.last().map(|e| e.at).unwrap_or_default() + self.tail
    }
}

impl ScenarioInput {
    pub fn resolve(self) -> anyhow::Result<Scenario> {
        let config = self.config.resolve()?;
        let candidates = self.candidates.unwrap_or(2);
        if candidates == 0 {
            anyhow::bail!("scenario needs at least one candidate");
        }
        let in_range = |id: u8| -> anyhow::Result<CandidateId> {
            if id < candidates {
                Ok(CandidateId(id))
            } else {
                Err(anyhow::anyhow!(
                    "candidate {} out of range (0..{})",
                    id,
                    candidates
                ))
            }
        };
        let default = in_range(self.default.unwrap_or(0))?;
        let active = in_range(self.active.unwrap_or(default.0))?;

        let mut seen = HashSet::new();
        let mut initial = Vec::new();
        for state in self.initial {
            let id = in_range(state.id)?;
            if !seen.insert(id) {
                continue;
            }
            if let Some(registration) = state.registration {
                initial.push(SwitchEvent::RegistrationChanged {
                    id,
                    state: registration,
                });
            }
            if let Some(enabled) = state.user_data_enabled {
                initial.push(SwitchEvent::UserDataEnabledChanged { id, enabled });
            }
            if let Some(allowed) = state.data_allowed {
                initial.push(SwitchEvent::DataAllowedChanged { id, allowed });
            }
            if let Some(level) = state.signal_level {
                initial.push(SwitchEvent::SignalLevelChanged {
                    id,
                    level: strata_switch::SignalLevel::new(level),
                });
            }
        }

        let mut events = Vec::with_capacity(self.events.len());
        for (idx, ev) in self.events.into_iter().enumerate() {
            let event = ev
                .resolve()
                .map_err(|e| anyhow::anyhow!("event #{}: {}", idx, e))?;
            events.push(TimedEvent {
                at: Duration::from_millis(ev.at_ms),
                event,
            });
        }
        // Stable: events sharing a timestamp keep file order.
        events.sort_by_key(|e| e.at);

        let default_tail = config
            .stability_threshold
            .unwrap_or_default()
            .saturating_mul(4);

        Ok(Scenario {
            name: self.name.unwrap_or_else(|| "unnamed".into()),
            candidates,
            default,
            active,
            config,
            validation: self.validation,
            validation_latency: Duration::from_millis(self.validation_latency_ms.unwrap_or(0)),
            tail: self
                .tail_ms
                .map(Duration::from_millis)
                .unwrap_or(default_tail),
            initial,
            events,
        })
    }
}

impl EventInput {
    fn resolve(&self) -> anyhow::Result<SimEvent> {
        let id = || {
            self.id
                .map(CandidateId)
                .ok_or_else(|| anyhow::anyhow!("{:?} event needs `id`", self.kind))
        };
        let event = match self.kind {
            EventKind::Registration => SwitchEvent::RegistrationChanged {
                id: id()?,
                state: self
                    .state
                    .ok_or_else(|| anyhow::anyhow!("registration event needs `state`"))?,
            },
            EventKind::UserData => SwitchEvent::UserDataEnabledChanged {
                id: id()?,
                enabled: self.enabled.unwrap_or(true),
            },
            EventKind::DataAllowed => SwitchEvent::DataAllowedChanged {
                id: id()?,
                allowed: self.enabled.unwrap_or(true),
            },
            EventKind::Signal => SwitchEvent::SignalLevelChanged {
                id: id()?,
                level: strata_switch::SignalLevel::new(self.level.unwrap_or(0)),
            },
            EventKind::NonCellular => SwitchEvent::DefaultNetworkChanged {
                non_cellular: self.enabled.unwrap_or(true),
            },
            EventKind::CallEnd => SwitchEvent::VoiceCallEnded,
            EventKind::SimLoaded => return Ok(SimEvent::SimLoaded(id()?)),
            EventKind::SimRemoved => return Ok(SimEvent::SimRemoved(id()?)),
        };
        Ok(SimEvent::Controller(event))
    }
}
