use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Write-ahead log configuration, per §4.G/§6.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WalConfig {
    pub wal_dir: PathBuf,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            wal_dir: PathBuf::from("wal"),
        }
    }
}
