use std::time::Duration;

use serde::Deserialize;

use crate::error::SwitchError;

pub const CONFIG_VERSION: u32 = 1;

/// Raw TOML shape. Every field is optional; [`SwitchConfigInput::resolve`]
/// fills defaults and validates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SwitchConfigInput {
    pub version: u32,
    /// Dwell time a decision must survive before it is acted on.
    /// Negative disables automatic switching.
    pub stability_threshold_ms: Option<i64>,
    pub require_ping_test_before_switch: Option<bool>,
    pub max_retries: Option<u32>,
    pub max_backoff_shift: Option<u32>,
}

/// Immutable configuration snapshot handed to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchConfig {
    /// `None` disables automatic switching entirely.
    pub stability_threshold: Option<Duration>,
    pub require_ping_test_before_switch: bool,
    pub max_retries: u32,
    /// Ceiling on the exponent used for retry backoff.
    pub max_backoff_shift: u32,
}

impl SwitchConfig {
    pub const DEFAULT_STABILITY_THRESHOLD: Duration = Duration::from_millis(10_000);
    pub const DEFAULT_MAX_RETRIES: u32 = 7;
    pub const DEFAULT_MAX_BACKOFF_SHIFT: u32 = 6;
    /// Exponent ceiling. The resulting delay is further bounded by
    /// [`SwitchConfig::MAX_BACKOFF`].
    pub const HARD_MAX_BACKOFF_SHIFT: u32 = 31;
    /// Longest accepted stability threshold. Larger values are rejected.
    pub const MAX_STABILITY_THRESHOLD: Duration = Duration::from_secs(24 * 60 * 60);
    /// Longest delay any retry pass is scheduled with.
    pub const MAX_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);

    pub fn is_enabled(&self) -> bool {
        self.stability_threshold.is_some()
    }

    pub fn from_toml_str(input: &str) -> Result<Self, SwitchError> {
        if input.trim().is_empty() {
            return Ok(SwitchConfig::default());
        }
        let parsed: SwitchConfigInput = toml::from_str(input)
            .map_err(|e| SwitchError::Config(format!("Invalid config TOML: {}", e)))?;
        parsed.resolve()
    }
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            stability_threshold: Some(Self::DEFAULT_STABILITY_THRESHOLD),
            require_ping_test_before_switch: true,
            max_retries: Self::DEFAULT_MAX_RETRIES,
            max_backoff_shift: Self::DEFAULT_MAX_BACKOFF_SHIFT,
        }
    }
}

impl SwitchConfigInput {
    pub fn resolve(self) -> Result<SwitchConfig, SwitchError> {
        let version = if self.version == 0 {
            CONFIG_VERSION
        } else {
            self.version
        };
        if version != CONFIG_VERSION {
            return Err(SwitchError::Config(format!(
                "Unsupported config version {}",
                version
            )));
        }

        let defaults = SwitchConfig::default();
        let stability_threshold = match self.stability_threshold_ms {
            None => defaults.stability_threshold,
            Some(ms) if ms < 0 => None,
            Some(ms) => {
                let threshold = Duration::from_millis(ms.unsigned_abs());
                if threshold > SwitchConfig::MAX_STABILITY_THRESHOLD {
                    return Err(SwitchError::Config(format!(
                        "stability_threshold_ms {} exceeds maximum {}",
                        ms,
                        SwitchConfig::MAX_STABILITY_THRESHOLD.as_millis()
                    )));
                }
                Some(threshold)
            }
        };

        Ok(SwitchConfig {
            stability_threshold,
            require_ping_test_before_switch: self
                .require_ping_test_before_switch
                .unwrap_or(defaults.require_ping_test_before_switch),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            max_backoff_shift: self
                .max_backoff_shift
                .unwrap_or(defaults.max_backoff_shift)
                .min(SwitchConfig::HARD_MAX_BACKOFF_SHIFT),
        })
    }
}
