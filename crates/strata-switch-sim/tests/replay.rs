//! Replay tests over the bundled scenario files and generated flap soaks.

use std::time::Duration;

use strata_switch::{CandidateId, EvaluationReason};
use strata_switch_sim::flap::{FlapConfig, FlapScenario};
use strata_switch_sim::replay::{replay, Command, CommandRecord};
use strata_switch_sim::scenario::Scenario;

fn rec(at_ms: u64, command: Command) -> CommandRecord {
    CommandRecord { at_ms, command }
}

#[test]
fn default_outage_retries_then_returns() {
    let scenario =
        Scenario::from_toml_str(include_str!("../scenarios/default_outage.toml")).unwrap();
    let report = replay(&scenario);

    assert_eq!(
        report.commands,
        vec![
            rec(
                6000,
                Command::RequestValidation {
                    target: CandidateId(1),
                    probe: true
                }
            ),
            rec(
                6500,
                Command::ValidationResult {
                    target: CandidateId(1),
                    success: false
                }
            ),
            rec(
                16500,
                Command::RequestValidation {
                    target: CandidateId(1),
                    probe: true
                }
            ),
            rec(
                17000,
                Command::ValidationResult {
                    target: CandidateId(1),
                    success: true
                }
            ),
            rec(
                46000,
                Command::RequestValidation {
                    target: CandidateId(0),
                    probe: true
                }
            ),
            rec(
                46500,
                Command::ValidationResult {
                    target: CandidateId(0),
                    success: true
                }
            ),
        ]
    );
    assert_eq!(report.final_active, CandidateId(0));
    assert_eq!(report.snapshot.consecutive_failures, 0);
}

#[test]
fn disabling_default_data_switches_back_immediately() {
    let scenario = Scenario::from_toml_str(include_str!("../scenarios/data_toggle.toml")).unwrap();
    let report = replay(&scenario);

    let last = report.commands.last().unwrap();
    assert_eq!(
        *last,
        rec(
            10000,
            Command::ImmediateSwitch {
                target: CandidateId(0),
                reason: EvaluationReason::SettingsChanged
            }
        )
    );
    assert_eq!(report.final_active, CandidateId(0));
}

#[test]
fn replay_is_deterministic() {
    let scenario =
        Scenario::from_toml_str(include_str!("../scenarios/default_outage.toml")).unwrap();
    assert_eq!(replay(&scenario).commands, replay(&scenario).commands);
}

#[test]
fn sub_threshold_flapping_never_switches() {
    for seed in [1, 7, 42, 1234] {
        let scenario = FlapScenario::new(FlapConfig {
            seed,
            duration: Duration::from_secs(300),
            ..Default::default()
        })
        .build();
        let report = replay(&scenario);
        let switches: Vec<_> = report
            .commands
            .iter()
            .filter(|r| r.command.is_switch_request())
            .collect();
        assert!(
            switches.is_empty(),
            "seed {seed}: unexpected switch requests {switches:?}"
        );
        assert_eq!(report.final_active, CandidateId(0));
        assert!(report.passes > 0);
    }
}

#[test]
fn long_outage_does_switch() {
    let toml = r#"
        [config]
        stability_threshold_ms = 1000
        require_ping_test_before_switch = false

        [[initial]]
        id = 0
        registration = "home"
        [[initial]]
        id = 1
        registration = "home"

        [[events]]
        at_ms = 100
        kind = "registration"
        id = 0
        state = "denied"
    "#;
    let report = replay(&Scenario::from_toml_str(toml).unwrap());
    assert_eq!(
        report.commands[0],
        rec(
            1100,
            Command::RequestValidation {
                target: CandidateId(1),
                probe: false
            }
        )
    );
    assert_eq!(report.final_active, CandidateId(1));
}

#[test]
fn report_serializes_with_flat_commands() {
    let scenario = Scenario::from_toml_str(include_str!("../scenarios/data_toggle.toml")).unwrap();
    let report = replay(&scenario);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["commands"][0]["command"], "request_validation");
    assert_eq!(json["commands"][0]["at_ms"], 3500);
    assert_eq!(json["final_active"], 0);
}
