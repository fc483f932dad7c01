use tmbft_types::{Block, BlockHash, Round, SignedProposal};

/// The events the driver feeds into the round state machine, per §4.H. The
/// driver has already resolved everything that requires committee/vote
/// knowledge (quorum checks, proposer identity, block validity) into the
/// booleans and values carried here; the state machine itself performs no
/// such lookups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// Enter a new round. If this node is the proposer and a block to
    /// propose is already known (`valid_value` or a pending unmined block),
    /// it is carried here; otherwise the round waits in `propose` for
    /// [`Input::ProposeAvailableBlock`].
    NewRound {
        is_proposer: bool,
        proposal: Option<(Block, Round)>,
    },
    /// A pending unmined block became available while a proposer round was
    /// waiting for one.
    ProposeAvailableBlock(Block),
    /// A proposal with no `valid_round` (a fresh proposal), from the round's
    /// proposer, with the driver's validity verdict.
    Proposal {
        message: SignedProposal,
        is_valid: bool,
    },
    /// A proposal carrying `valid_round = vr < round`, where the driver has
    /// confirmed a quorum of prevotes for `id(block)` at round `vr`.
    ProposalAndPolkaPrevious {
        message: SignedProposal,
        is_valid: bool,
    },
    /// 2f+1 prevotes for any value, first time this round.
    PolkaAny,
    /// 2f+1 prevotes for nil.
    PolkaNil,
    /// 2f+1 prevotes for `id(v)`, with the driver having confirmed a
    /// matching proposal is on record for this round.
    PolkaValue(BlockHash),
    /// 2f+1 precommits for any value, first time this round.
    PrecommitAny,
    /// 2f+1 precommits for `id(v)`, with the driver having confirmed a
    /// matching proposal at `round`. Precommit quorum can arrive for any
    /// round of the current height, not just the round currently active.
    PrecommitValue { value: BlockHash, round: Round },
    TimeoutPropose,
    TimeoutPrevote,
}
