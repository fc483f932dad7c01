use tmbft_types::{BlockHash, Height, Round, SignedProposal, Step};

/// A value this node has locked or last observed 2f+1 prevotes for, carrying
/// the round that backed it (needed to compare against a proposal's
/// `valid_round` on re-proposal, per §4.H).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LockedValue {
    pub hash: BlockHash,
    pub round: Round,
}

/// The state of the current `(height, round)`, per §3/§4.D.
///
/// Message sets are not stored here: they live in `tmbft-votekeeper` and are
/// owned by the driver, which is the only component that needs to retain
/// every prior round's votes for proof-of-lock lookups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundState {
    pub height: Height,
    pub round: Round,
    pub step: Step,
    pub proposal: Option<SignedProposal>,
    pub locked_value: Option<LockedValue>,
    pub valid_value: Option<LockedValue>,
    pub sent_proposal: bool,
    pub sent_prevote: bool,
    pub sent_precommit: bool,
    /// First-time guard: the prevote timer is scheduled only once per round,
    /// on the first 2f+1-prevotes-for-anything observation.
    pub prevote_timeout_scheduled: bool,
    /// First-time guard, mirroring `prevote_timeout_scheduled` for
    /// precommits.
    pub precommit_timeout_scheduled: bool,
}

impl RoundState {
    /// The state a height starts in: round 0, propose step, no carried-over
    /// lock (locking state is reset only across heights, never rounds).
    pub fn new_height(height: Height) -> Self {
        Self {
            height,
            round: Round::INITIAL,
            step: Step::Propose,
            proposal: None,
            locked_value: None,
            valid_value: None,
            sent_proposal: false,
            sent_prevote: false,
            sent_precommit: false,
            prevote_timeout_scheduled: false,
            precommit_timeout_scheduled: false,
        }
    }

    /// Moves to `round`, preserving `locked_value` and `valid_value` as
    /// required by §4.D for proof-of-lock carry-over.
    pub fn with_new_round(&self, round: Round) -> Self {
        Self {
            height: self.height,
            round,
            step: Step::Propose,
            proposal: None,
            locked_value: self.locked_value,
            valid_value: self.valid_value,
            sent_proposal: false,
            sent_prevote: false,
            sent_precommit: false,
            prevote_timeout_scheduled: false,
            precommit_timeout_scheduled: false,
        }
    }
}
