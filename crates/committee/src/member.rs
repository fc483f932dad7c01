use tmbft_types::Address;

/// A validator's voting power. Always positive: a member with zero power is
/// not a committee member.
pub type VotingPower = u64;

/// `{address, voting_power}`, per §3 of the spec.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CommitteeMember {
    pub address: Address,
    pub voting_power: VotingPower,
}

impl CommitteeMember {
    pub const fn new(address: Address, voting_power: VotingPower) -> Self {
        Self {
            address,
            voting_power,
        }
    }
}
