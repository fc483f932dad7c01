use tmbft_types::{Block, BlockHash, Round, Timeout, VoteData};

/// An effect the driver must carry out after a transition: broadcast
/// something, start a timer, or deliver a decision to the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    Propose { valid_round: Round, block: Block },
    Vote(VoteData),
    ScheduleTimeout(Timeout),
    /// The height is decided: `(value, round)` the precommit quorum was
    /// observed at. The driver holds the actual block bytes and emits the
    /// backend `commit` call.
    Decide { value: BlockHash, round: Round },
}
