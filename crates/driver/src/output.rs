use tmbft_types::{Block, BlockHash, Round, Timeout, VoteType};

/// An effect the engine must carry out in response to driving the consensus
/// state forward, per §4.H/§6. All outputs are relative to the driver's
/// current height; `Decide` is the only one that can reference a past round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    /// Broadcast `proposal{height, round, block, valid_round}` and set
    /// `sent_proposal`.
    Propose { round: Round, valid_round: Round, block: Block },
    /// Broadcast a prevote or precommit for `value` (`BlockHash::NIL` for a
    /// nil vote) in the current round.
    Vote { round: Round, vote_type: VoteType, value: BlockHash },
    /// Schedule a timer, tagged with the `(height, round)` it was raised
    /// for so the engine can discard it if delivered after the fact.
    ScheduleTimeout(Timeout),
    /// The height is decided at `(round, value)`. The engine retrieves the
    /// full block and committed seals via [`crate::Driver::block_for`] and
    /// [`crate::Driver::committed_seals`] before calling the backend.
    Decide { round: Round, value: BlockHash },
}
