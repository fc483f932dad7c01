use displaydoc::Display;

/// Failures the dispatcher cannot route around, per §6/§7.
///
/// Every other error kind in §7 (`decode_error`, `invalid_signature`,
/// `unauthorized`, `old_message`, ...) is local recovery: the offending
/// message is dropped and logged, and consensus proceeds. This type exists
/// only for the single fatal class the spec names: failing to read the
/// last committed block at startup.
#[derive(Debug, Display, thiserror::Error)]
pub enum StartupError {
    /// failed to read the last committed block: {0}
    LastCommittedBlockUnreadable(std::io::Error),
}

pub type Result<T> = std::result::Result<T, StartupError>;
