use rand::RngExt as _;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;

use strata_switch::{CandidateId, RegistrationState, SwitchConfig, SwitchEvent};

use crate::scenario::{Scenario, SimEvent, TimedEvent};

/// Configuration for a seeded registration-flap soak.
#[derive(Debug, Clone)]
pub struct FlapConfig {
    pub seed: u64,
    pub duration: Duration,
    pub stability_threshold: Duration,
    /// Longest outage, as a fraction of the stability threshold. Values
    /// below 1.0 keep every outage shorter than the debounce window.
    pub max_outage_ratio: f64,
    /// Bounds for time spent in service between outages.
    pub min_up: Duration,
    pub max_up: Duration,
}

impl Default for FlapConfig {
    fn default() -> Self {
        FlapConfig {
            seed: 1,
            duration: Duration::from_secs(600),
            stability_threshold: SwitchConfig::DEFAULT_STABILITY_THRESHOLD,
            max_outage_ratio: 0.9,
            min_up: Duration::from_millis(200),
            max_up: Duration::from_secs(20),
        }
    }
}

/// Deterministic random-walk generator for default-candidate flapping.
///
/// Candidate 0 (default) alternates between `Home` and an out-of-service
/// state; candidate 1 stays on `Home` throughout. Given a seed, produces
/// the same scenario every time.
#[derive(Debug)]
pub struct FlapScenario {
    cfg: FlapConfig,
    rng: StdRng,
}

impl FlapScenario {
    pub fn new(cfg: FlapConfig) -> Self {
        let rng = StdRng::seed_from_u64(cfg.seed);
        Self { cfg, rng }
    }

    pub fn build(&mut self) -> Scenario {
        let threshold = self.cfg.stability_threshold;
        let mut events = Vec::new();
        let mut t = Duration::ZERO;

        loop {
            t += rand_between(&mut self.rng, self.cfg.min_up, self.cfg.max_up);
            if t >= self.cfg.duration {
                break;
            }
            let lost = if self.rng.random::<bool>() {
                RegistrationState::NotRegistered
            } else {
                RegistrationState::Searching
            };
            events.push(registration(t, 0, lost));

            let max_outage = threshold.mul_f64(self.cfg.max_outage_ratio.max(0.0));
            t += rand_between(&mut self.rng, Duration::from_millis(1), max_outage);
            events.push(registration(t, 0, RegistrationState::Home));
        }

        Scenario {
            name: format!("flap-seed-{}", self.cfg.seed),
            candidates: 2,
            default: CandidateId(0),
            active: CandidateId(0),
            config: SwitchConfig {
                stability_threshold: Some(threshold),
                ..SwitchConfig::default()
            },
            validation: Vec::new(),
            validation_latency: Duration::ZERO,
            tail: threshold.saturating_mul(2),
            initial: vec![
                SwitchEvent::RegistrationChanged {
                    id: CandidateId(0),
                    state: RegistrationState::Home,
                },
                SwitchEvent::RegistrationChanged {
                    id: CandidateId(1),
                    state: RegistrationState::Home,
                },
            ],
            events,
        }
    }
}

fn registration(at: Duration, id: u8, state: RegistrationState) -> TimedEvent {
    TimedEvent {
        at,
        event: SimEvent::Controller(SwitchEvent::RegistrationChanged {
            id: CandidateId(id),
            state,
        }),
    }
}

fn rand_between(rng: &mut StdRng, lo: Duration, hi: Duration) -> Duration {
    if hi <= lo {
        return lo;
    }
    lo + (hi - lo).mul_f64(rng.random::<f64>())
}
