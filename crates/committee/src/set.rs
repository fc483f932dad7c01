use tmbft_types::{Address, Round};

use crate::member::{CommitteeMember, VotingPower};
use crate::policy::ProposerPolicy;

/// An immutable, height-bound snapshot of committee membership, per §4.A.
///
/// Construction is pure: two `CommitteeSet`s built from the same member
/// list, policy and last-proposer are indistinguishable, which is what
/// lets every honest node agree on the proposer for any `(height, round)`
/// without further communication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitteeSet {
    /// Sorted by (voting power descending, address ascending), matching
    /// every honest node's view so that `get_by_index` is the same
    /// function everywhere.
    members: Vec<CommitteeMember>,
    policy: ProposerPolicy,
    /// The address of whoever proposed successfully at the previous
    /// height, if known. `None` at genesis.
    last_proposer: Option<Address>,
    total_voting_power: VotingPower,
    /// Weighted expansion of `members` used by `proposer()`: each member
    /// appears `voting_power` times, in member order, so that indexing
    /// modulo `total_voting_power` visits each member proportionally to
    /// its power over any `total_voting_power` consecutive rounds (P5).
    weighted: Vec<usize>,
}

impl CommitteeSet {
    pub fn new(
        members: impl IntoIterator<Item = CommitteeMember>,
        policy: ProposerPolicy,
        last_proposer: Option<Address>,
    ) -> Self {
        let mut members: Vec<_> = members.into_iter().collect();
        members.sort_unstable_by(|a, b| {
            b.voting_power
                .cmp(&a.voting_power)
                .then_with(|| a.address.cmp(&b.address))
        });

        let total_voting_power = members.iter().map(|m| m.voting_power).sum();

        let mut weighted = Vec::with_capacity(total_voting_power as usize);
        for (index, member) in members.iter().enumerate() {
            weighted.extend(std::iter::repeat_n(index, member.voting_power as usize));
        }

        Self {
            members,
            policy,
            last_proposer,
            total_voting_power,
            weighted,
        }
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn total_voting_power(&self) -> VotingPower {
        self.total_voting_power
    }

    pub fn policy(&self) -> ProposerPolicy {
        self.policy
    }

    pub fn get_by_index(&self, index: usize) -> Option<&CommitteeMember> {
        self.members.get(index)
    }

    /// Returns the member's index and data, or `None` if `address` is not a
    /// current committee member.
    pub fn get_by_address(&self, address: &Address) -> Option<(usize, &CommitteeMember)> {
        self.members
            .iter()
            .enumerate()
            .find(|(_, m)| &m.address == address)
    }

    pub fn is_member(&self, address: &Address) -> bool {
        self.get_by_address(address).is_some()
    }

    /// `⌊(N−1)/3⌋`, the maximum tolerated byzantine voting power.
    pub fn f(&self) -> VotingPower {
        self.total_voting_power.saturating_sub(1) / 3
    }

    /// `⌈2N/3⌉`, the threshold for making progress.
    pub fn quorum(&self) -> VotingPower {
        (2 * self.total_voting_power).div_ceil(3)
    }

    /// The deterministic proposer for `round`, per §4.A. `round` and `base`
    /// are positions in the weighted expansion, not raw member indices, so
    /// that advancing by one always advances by one unit of voting power
    /// rather than skipping a weighted member entirely.
    pub fn proposer(&self, round: Round) -> &CommitteeMember {
        debug_assert!(!self.members.is_empty());

        let last_proposer_weighted_pos = self
            .last_proposer
            .and_then(|addr| self.get_by_address(&addr))
            .and_then(|(index, _)| self.weighted.iter().position(|&i| i == index));

        let base = match self.policy {
            // Round-robin picks up the member *after* whoever proposed last
            // height, so the height-0 round-0 proposer never proposes twice
            // in a row.
            ProposerPolicy::RoundRobin => last_proposer_weighted_pos.map(|i| i + 1).unwrap_or(0),
            ProposerPolicy::Sticky => last_proposer_weighted_pos.unwrap_or(0),
        };

        let offset = (base as i64 + round.as_i64()).rem_euclid(self.weighted.len() as i64) as usize;
        let member_index = self.weighted[offset];
        &self.members[member_index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::new([b; Address::LENGTH])
    }

    fn uniform_committee(n: u8, policy: ProposerPolicy, last: Option<Address>) -> CommitteeSet {
        CommitteeSet::new(
            (0..n).map(|i| CommitteeMember::new(addr(i), 1)),
            policy,
            last,
        )
    }

    #[test]
    fn quorum_and_f_boundary_n1() {
        let set = uniform_committee(1, ProposerPolicy::RoundRobin, None);
        assert_eq!(set.quorum(), 1);
        assert_eq!(set.f(), 0);
    }

    #[test]
    fn quorum_and_f_boundary_n4() {
        let set = uniform_committee(4, ProposerPolicy::RoundRobin, None);
        assert_eq!(set.f(), 1);
        assert_eq!(set.quorum(), 3);
    }

    #[test]
    fn round_robin_genesis_base_is_index_zero() {
        let set = uniform_committee(4, ProposerPolicy::RoundRobin, None);
        assert_eq!(set.proposer(Round::new(0)).address, addr(0));
        assert_eq!(set.proposer(Round::new(1)).address, addr(1));
        assert_eq!(set.proposer(Round::new(4)).address, addr(0));
    }

    #[test]
    fn round_robin_advances_from_last_proposer() {
        // Scenario 1: base=A, height=1 commits with proposer A; next height
        // (base=A, since A was the successful proposer) should start with B.
        let set = uniform_committee(4, ProposerPolicy::RoundRobin, Some(addr(0)));
        assert_eq!(set.proposer(Round::new(0)).address, addr(1));
    }

    #[test]
    fn sticky_uses_last_proposer_index_and_falls_back_to_zero() {
        let set = uniform_committee(4, ProposerPolicy::Sticky, Some(addr(2)));
        assert_eq!(set.proposer(Round::new(0)).address, addr(2));
        assert_eq!(set.proposer(Round::new(1)).address, addr(3));

        let unknown = uniform_committee(4, ProposerPolicy::Sticky, None);
        assert_eq!(unknown.proposer(Round::new(0)).address, addr(0));
    }

    #[test]
    fn proposer_selection_is_weighted_by_voting_power() {
        // P5: over N=total_voting_power consecutive rounds, a member with
        // power `w` is proposer exactly `w` times.
        let set = CommitteeSet::new(
            [
                CommitteeMember::new(addr(0), 2),
                CommitteeMember::new(addr(1), 1),
                CommitteeMember::new(addr(2), 1),
            ],
            ProposerPolicy::RoundRobin,
            None,
        );

        let total = set.total_voting_power();
        let mut counts = std::collections::BTreeMap::new();
        for r in 0..total {
            let proposer = set.proposer(Round::new(r as i64)).address;
            *counts.entry(proposer).or_insert(0u64) += 1;
        }

        assert_eq!(counts[&addr(0)], 2);
        assert_eq!(counts[&addr(1)], 1);
        assert_eq!(counts[&addr(2)], 1);
    }

    #[test]
    fn members_are_sorted_by_power_desc_then_address_asc() {
        let set = CommitteeSet::new(
            [
                CommitteeMember::new(addr(5), 1),
                CommitteeMember::new(addr(1), 3),
                CommitteeMember::new(addr(2), 3),
            ],
            ProposerPolicy::RoundRobin,
            None,
        );

        assert_eq!(set.get_by_index(0).unwrap().address, addr(1));
        assert_eq!(set.get_by_index(1).unwrap().address, addr(2));
        assert_eq!(set.get_by_index(2).unwrap().address, addr(5));
    }
}
