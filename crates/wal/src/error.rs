use displaydoc::Display;

/// Failures from the write-ahead log, per §4.G. None of these are fatal to
/// consensus: the WAL is a liveness aid, not a safety mechanism, and the
/// engine logs and continues without it on open failure.
#[derive(Debug, Display, thiserror::Error)]
pub enum WalError {
    /// I/O error: {0}
    Io(#[from] std::io::Error),
    /// corrupt entry at byte offset {0}: length/CRC mismatch
    Corrupt(u64),
}

pub type Result<T> = std::result::Result<T, WalError>;
