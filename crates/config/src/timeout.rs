use std::time::Duration;

use serde::{Deserialize, Serialize};
use tmbft_types::{Round, TimeoutStep};

/// Initial timeout durations and their per-round deltas, per §4.E. Defaults
/// reproduce the schedule given there: `propose(r) = 3000ms + 500ms·r`,
/// `prevote(r) = precommit(r) = 1000ms + 500ms·r`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(with = "humantime_serde")]
    pub timeout_propose: Duration,
    #[serde(with = "humantime_serde")]
    pub timeout_propose_delta: Duration,

    #[serde(with = "humantime_serde")]
    pub timeout_prevote: Duration,
    #[serde(with = "humantime_serde")]
    pub timeout_prevote_delta: Duration,

    #[serde(with = "humantime_serde")]
    pub timeout_precommit: Duration,
    #[serde(with = "humantime_serde")]
    pub timeout_precommit_delta: Duration,
}

impl TimeoutConfig {
    /// The duration to schedule a `step` timer for at `round`, per §4.E.
    pub fn duration(&self, step: TimeoutStep, round: Round) -> Duration {
        let r = round.as_i64().max(0) as u32;
        let (base, delta) = match step {
            TimeoutStep::Propose => (self.timeout_propose, self.timeout_propose_delta),
            TimeoutStep::Prevote => (self.timeout_prevote, self.timeout_prevote_delta),
            TimeoutStep::Precommit => (self.timeout_precommit, self.timeout_precommit_delta),
        };
        base + delta * r
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            timeout_propose: Duration::from_secs(3),
            timeout_propose_delta: Duration::from_millis(500),
            timeout_prevote: Duration::from_secs(1),
            timeout_prevote_delta: Duration::from_millis(500),
            timeout_precommit: Duration::from_secs(1),
            timeout_precommit_delta: Duration::from_millis(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_schedule() {
        let config = TimeoutConfig::default();
        assert_eq!(config.duration(TimeoutStep::Propose, Round::new(0)), Duration::from_millis(3000));
        assert_eq!(config.duration(TimeoutStep::Propose, Round::new(2)), Duration::from_millis(4000));
        assert_eq!(config.duration(TimeoutStep::Prevote, Round::new(1)), Duration::from_millis(1500));
        assert_eq!(config.duration(TimeoutStep::Precommit, Round::new(3)), Duration::from_millis(2500));
    }
}
