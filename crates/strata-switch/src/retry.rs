//! Consecutive validation-failure bookkeeping for one switch attempt.

/// What to do after a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryVerdict {
    /// Re-evaluate after backoff. `attempt` is the failure count the backoff
    /// should be computed from (count before this failure was recorded).
    Retry { attempt: u32 },
    /// Ceiling reached; counter reset, no automatic retry.
    GiveUp,
}

#[derive(Debug, Clone)]
pub struct RetryCountGovernor {
    consecutive_failures: u32,
    max_retries: u32,
}

impl RetryCountGovernor {
    pub fn new(max_retries: u32) -> Self {
        RetryCountGovernor {
            consecutive_failures: 0,
            max_retries,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn set_max_retries(&mut self, max_retries: u32) {
        self.max_retries = max_retries;
        self.consecutive_failures = self.consecutive_failures.min(max_retries);
    }

    pub fn on_validation_failed(&mut self) -> RetryVerdict {
        if self.consecutive_failures < self.max_retries {
            let attempt = self.consecutive_failures;
            self.consecutive_failures += 1;
            RetryVerdict::Retry { attempt }
        } else {
            self.consecutive_failures = 0;
            RetryVerdict::GiveUp
        }
    }

    pub fn on_validation_succeeded(&mut self) {
        self.reset();
    }

    pub fn on_environment_changed(&mut self) {
        self.reset();
    }

    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_until_ceiling_then_gives_up() {
        let mut g = RetryCountGovernor::new(3);
        for expected in 0..3 {
            assert_eq!(
                g.on_validation_failed(),
                RetryVerdict::Retry { attempt: expected }
            );
            assert!(g.consecutive_failures() <= g.max_retries());
        }
        assert_eq!(g.consecutive_failures(), 3);
        assert_eq!(g.on_validation_failed(), RetryVerdict::GiveUp);
        assert_eq!(g.consecutive_failures(), 0);
    }

    #[test]
    fn zero_retries_gives_up_immediately() {
        let mut g = RetryCountGovernor::new(0);
        assert_eq!(g.on_validation_failed(), RetryVerdict::GiveUp);
    }

    #[test]
    fn success_and_environment_change_reset() {
        let mut g = RetryCountGovernor::new(5);
        g.on_validation_failed();
        g.on_validation_failed();
        g.on_validation_succeeded();
        assert_eq!(g.consecutive_failures(), 0);

        g.on_validation_failed();
        g.on_environment_changed();
        assert_eq!(g.consecutive_failures(), 0);
    }

    #[test]
    fn lowering_ceiling_clamps_counter() {
        let mut g = RetryCountGovernor::new(5);
        for _ in 0..4 {
            g.on_validation_failed();
        }
        g.set_max_retries(2);
        assert_eq!(g.consecutive_failures(), 2);
        assert_eq!(g.on_validation_failed(), RetryVerdict::GiveUp);
    }
}
