use std::collections::BTreeMap;

use tmbft_committee::VotingPower;
use tmbft_types::{Height, Round, SignedVote, VoteType};

use crate::round_votes::RoundVotes;
use crate::threshold::Threshold;

/// Tracks vote message sets across every round reached during a height, per
/// §4.C/§4.D. Rounds are created lazily on first vote; earlier rounds are
/// retained for the lifetime of the height so that proof-of-lock lookups
/// (§4.H, valid-round reuse) can inspect a prior round's prevotes.
#[derive(Clone, Debug)]
pub struct VoteKeeper {
    height: Height,
    total_power: VotingPower,
    rounds: BTreeMap<Round, RoundVotes>,
}

impl VoteKeeper {
    pub fn new(height: Height, total_power: VotingPower) -> Self {
        let mut rounds = BTreeMap::new();
        rounds.insert(Round::INITIAL, RoundVotes::new(total_power));
        Self {
            height,
            total_power,
            rounds,
        }
    }

    pub fn height(&self) -> Height {
        self.height
    }

    /// Applies `vote` to its round's message set, returning the highest
    /// threshold that round/step combination has now reached.
    pub fn apply(&mut self, vote_type: VoteType, vote: SignedVote, weight: VotingPower) -> Threshold {
        let round = vote.round;
        let total_power = self.total_power;
        self.rounds
            .entry(round)
            .or_insert_with(|| RoundVotes::new(total_power))
            .add_vote(vote_type, vote, weight)
    }

    /// The message sets recorded for `round`, if any vote has arrived for it.
    pub fn round(&self, round: Round) -> Option<&RoundVotes> {
        self.rounds.get(&round)
    }
}
