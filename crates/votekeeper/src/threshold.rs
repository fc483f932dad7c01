use tmbft_committee::VotingPower;
use tmbft_types::BlockHash;

/// `value >= ceil(2 * total / 3)`, per the quorum definition in §3. Matches
/// [`tmbft_committee::CommitteeSet::quorum`]'s formula, not a strict `>`.
pub fn is_quorum(value: VotingPower, total: VotingPower) -> bool {
    3 * value >= 2 * total
}

/// The highest threshold a vote type has reached for a round, returned by
/// [`crate::MessageSet::add`] and [`crate::VoteKeeper::apply`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Threshold {
    /// No quorum yet.
    Init,
    /// Quorum reached, but split across values (no single value or nil has
    /// quorum on its own).
    Any,
    /// Quorum for nil.
    Nil,
    /// Quorum for a specific block.
    Value(BlockHash),
}
