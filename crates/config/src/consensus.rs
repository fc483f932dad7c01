use std::time::Duration;

use serde::{Deserialize, Serialize};
use tmbft_committee::ProposerPolicy;

use crate::timeout::TimeoutConfig;

/// Consensus-level configuration, per §6.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    pub proposer_policy: ProposerPolicy,

    /// Minimum gap between successive headers.
    #[serde(with = "humantime_serde")]
    pub block_period: Duration,

    #[serde(flatten)]
    pub timeouts: TimeoutConfig,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            proposer_policy: ProposerPolicy::default(),
            block_period: Duration::from_secs(1),
            timeouts: TimeoutConfig::default(),
        }
    }
}
