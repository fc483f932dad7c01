use tmbft_committee::VotingPower;
use tmbft_types::{SignedVote, VoteType};

use crate::message_set::MessageSet;
use crate::threshold::Threshold;

/// The prevote and precommit message sets for a single round, per §4.D.
#[derive(Clone, Debug)]
pub struct RoundVotes {
    pub prevotes: MessageSet,
    pub precommits: MessageSet,
}

impl RoundVotes {
    pub fn new(total_power: VotingPower) -> Self {
        Self {
            prevotes: MessageSet::new(total_power),
            precommits: MessageSet::new(total_power),
        }
    }

    pub fn add_vote(&mut self, vote_type: VoteType, vote: SignedVote, weight: VotingPower) -> Threshold {
        match vote_type {
            VoteType::Prevote => self.prevotes.add(vote, weight),
            VoteType::Precommit => self.precommits.add(vote, weight),
        }
    }
}
