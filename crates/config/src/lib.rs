//! Engine configuration, per §6: timeouts, WAL directory, proposer policy
//! and the liveness watchdog period. Loaded with the `config` crate so that
//! a TOML file and environment overrides (prefix `TMBFT`) compose the same
//! way any other setting in the stack does.

mod consensus;
mod timeout;
mod wal;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use consensus::ConsensusConfig;
pub use timeout::TimeoutConfig;
pub use wal::WalConfig;

/// Top-level engine configuration, per §6 ("Core configuration").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Watchdog period: if neither height nor round has advanced between
    /// two ticks, the WAL for the current height is replayed.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    pub consensus: ConsensusConfig,
    pub wal: WalConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            consensus: ConsensusConfig::default(),
            wal: WalConfig::default(),
        }
    }
}

/// Loads configuration from `config_file_path`, overlaid with any
/// `TMBFT__`-prefixed environment variables (double underscore as the
/// nested-field separator, e.g. `TMBFT__CONSENSUS__BLOCK_PERIOD`).
pub fn load_config(config_file_path: &Path) -> Result<Config, String> {
    config::Config::builder()
        .add_source(config::File::from(config_file_path))
        .add_source(config::Environment::with_prefix("TMBFT").separator("__"))
        .build()
        .map_err(|error| error.to_string())?
        .try_deserialize()
        .map_err(|error| error.to_string())
}
