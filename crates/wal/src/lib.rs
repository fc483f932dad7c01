//! Per-height write-ahead log of outgoing broadcasts, per §4.G. A liveness
//! aid replayed by the watchdog task (§4.I), not a safety mechanism.

mod error;
mod log;

pub use error::{Result, WalError};
pub use log::Wal;
