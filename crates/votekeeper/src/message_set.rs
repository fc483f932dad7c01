use std::collections::BTreeMap;

use tmbft_committee::VotingPower;
use tmbft_types::{Address, BlockHash, SignedVote};

use crate::threshold::{is_quorum, Threshold};

/// Per-round, per-step vote aggregation, per §4.C.
///
/// Indexes votes two ways: by block hash (for proposal-backed votes) and
/// separately for nil, so that a single sender can contribute at most one
/// vote to each. `add` is first-write-wins: a resend from a sender who has
/// already voted this round/step is silently ignored, which is what makes
/// [`MessageSet::total`] a true count of distinct voters.
#[derive(Clone, Debug)]
pub struct MessageSet {
    by_hash: BTreeMap<BlockHash, BTreeMap<Address, SignedVote>>,
    nil: BTreeMap<Address, SignedVote>,
    /// Weight already tallied per value, keyed the same way as `is_quorum`
    /// expects: `None` for nil.
    weights: BTreeMap<Option<BlockHash>, VotingPower>,
    /// Total voting power of the committee this round belongs to; fixed at
    /// construction, independent of how many votes have arrived.
    total_power: VotingPower,
}

impl MessageSet {
    pub fn new(total_power: VotingPower) -> Self {
        Self {
            by_hash: BTreeMap::new(),
            nil: BTreeMap::new(),
            weights: BTreeMap::new(),
            total_power,
        }
    }

    /// Adds `vote` from `sender` carrying `weight` voting power. Returns the
    /// highest threshold reached for this message set so far, whether or
    /// not this particular vote was new.
    pub fn add(&mut self, vote: SignedVote, weight: VotingPower) -> Threshold {
        let key = vote.payload.value_or_nil();
        let sender = vote.sender;

        let is_new = match key {
            Some(hash) => self.by_hash.entry(hash).or_default().insert(sender, vote).is_none(),
            None => self.nil.insert(sender, vote).is_none(),
        };

        if is_new {
            *self.weights.entry(key).or_insert(0) += weight;
        }

        match key {
            Some(hash) if is_quorum(self.weights[&Some(hash)], self.total_power) => {
                Threshold::Value(hash)
            }
            None if is_quorum(self.weights[&None], self.total_power) => Threshold::Nil,
            _ => {
                let sum: VotingPower = self.weights.values().sum();
                if is_quorum(sum, self.total_power) {
                    Threshold::Any
                } else {
                    Threshold::Init
                }
            }
        }
    }

    /// Whether `threshold` is currently met, independent of the order votes
    /// arrived in.
    pub fn is_threshold_met(&self, threshold: Threshold) -> bool {
        match threshold {
            Threshold::Value(hash) => {
                is_quorum(self.weights.get(&Some(hash)).copied().unwrap_or(0), self.total_power)
            }
            Threshold::Nil => is_quorum(self.weights.get(&None).copied().unwrap_or(0), self.total_power),
            Threshold::Any => {
                let sum: VotingPower = self.weights.values().sum();
                is_quorum(sum, self.total_power)
            }
            Threshold::Init => false,
        }
    }

    pub fn count(&self, hash: &BlockHash) -> usize {
        self.by_hash.get(hash).map_or(0, |m| m.len())
    }

    pub fn count_nil(&self) -> usize {
        self.nil.len()
    }

    pub fn total(&self) -> usize {
        self.by_hash.values().map(|m| m.len()).sum::<usize>() + self.nil.len()
    }

    /// Distinct senders who have voted, for any value, in this message set —
    /// used by the f+1 future-round catch-up counter (§4.F).
    pub fn voters(&self) -> impl Iterator<Item = &Address> {
        self.by_hash
            .values()
            .flat_map(|m| m.keys())
            .chain(self.nil.keys())
    }

    /// A stable snapshot of the votes recorded for `hash`.
    pub fn values(&self, hash: &BlockHash) -> Vec<&SignedVote> {
        self.by_hash
            .get(hash)
            .map(|m| m.values().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmbft_types::{Height, Round, Signature, Signed, VoteData, VoteType};

    fn addr(b: u8) -> Address {
        Address::new([b; Address::LENGTH])
    }

    fn hash(b: u8) -> BlockHash {
        BlockHash::new([b; BlockHash::LENGTH])
    }

    fn vote(sender: Address, value: BlockHash) -> SignedVote {
        Signed::new(
            Height::new(10),
            Round::new(2),
            sender,
            VoteData {
                vote_type: VoteType::Prevote,
                value,
            },
            Signature::new(vec![]),
        )
    }

    #[test]
    fn duplicate_vote_is_ignored_scenario_6() {
        let mut set = MessageSet::new(4);
        let v = vote(addr(1), hash(9));
        assert_eq!(set.add(v.clone(), 1), Threshold::Init);
        assert_eq!(set.add(v, 1), Threshold::Init);
        assert_eq!(set.count(&hash(9)), 1);
        assert_eq!(set.total(), 1);
    }

    #[test]
    fn quorum_for_value_at_n4() {
        let mut set = MessageSet::new(4);
        assert_eq!(set.add(vote(addr(1), hash(9)), 1), Threshold::Init);
        assert_eq!(set.add(vote(addr(2), hash(9)), 1), Threshold::Init);
        assert_eq!(set.add(vote(addr(3), hash(9)), 1), Threshold::Value(hash(9)));
    }

    #[test]
    fn quorum_for_nil_is_distinct_from_value() {
        let mut set = MessageSet::new(4);
        set.add(vote(addr(1), BlockHash::NIL), 1);
        set.add(vote(addr(2), BlockHash::NIL), 1);
        let threshold = set.add(vote(addr(3), BlockHash::NIL), 1);
        assert_eq!(threshold, Threshold::Nil);
        assert_eq!(set.count_nil(), 3);
        assert_eq!(set.count(&hash(9)), 0);
    }

    #[test]
    fn quorum_at_exact_ceiling_for_a_total_divisible_by_three() {
        // total=3, quorum=ceil(2*3/3)=2: the boundary the strict `>` form
        // of `is_quorum` used to miss.
        let mut set = MessageSet::new(3);
        assert_eq!(set.add(vote(addr(1), hash(9)), 1), Threshold::Init);
        assert_eq!(set.add(vote(addr(2), hash(9)), 1), Threshold::Value(hash(9)));
    }

    #[test]
    fn split_votes_reach_any_not_value() {
        let mut set = MessageSet::new(4);
        set.add(vote(addr(1), hash(1)), 1);
        set.add(vote(addr(2), hash(2)), 1);
        let threshold = set.add(vote(addr(3), BlockHash::NIL), 1);
        assert_eq!(threshold, Threshold::Any);
    }
}
