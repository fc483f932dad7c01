use std::collections::BTreeMap;

use tmbft_types::{Address, Round, SignedProposal};

/// Proposals recorded for a single round: normally at most one, from the
/// round's proposer. A second, differing proposal from the same address is
/// equivocation and is filed as evidence rather than accepted.
#[derive(Default, Clone, Debug)]
struct PerRound {
    proposals: Vec<SignedProposal>,
}

/// Proposals the driver has seen this height, keyed by round, per §4.H I3
/// ("at most one proposal from the correct proposer is accepted").
///
/// The round state machine itself already refuses a second `Input::Proposal`
/// once `RoundState::proposal` is set; this keeper additionally preserves
/// both conflicting proposals as evidence of byzantine behavior and lets the
/// driver look a proposal up by `(round, value)` when matching precommits or
/// re-derived prevote thresholds against it.
#[derive(Default, Clone, Debug)]
pub struct ProposalKeeper {
    per_round: BTreeMap<Round, PerRound>,
    evidence: Vec<(SignedProposal, SignedProposal)>,
}

impl ProposalKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `proposal`. Returns `true` if it conflicts with an earlier
    /// proposal from the same sender for the same round (equivocation).
    pub fn record(&mut self, proposal: SignedProposal) -> bool {
        let round = proposal.round;
        let entry = self.per_round.entry(round).or_default();

        if let Some(existing) = entry.proposals.iter().find(|p| p.sender == proposal.sender) {
            if existing == &proposal {
                return false;
            }
            self.evidence.push((existing.clone(), proposal));
            return true;
        }

        entry.proposals.push(proposal);
        false
    }

    /// The first proposal recorded for `round`, if any.
    pub fn get(&self, round: Round) -> Option<&SignedProposal> {
        self.per_round.get(&round)?.proposals.first()
    }

    /// Addresses caught proposing two conflicting values in the same round.
    pub fn equivocators(&self) -> impl Iterator<Item = &Address> {
        self.evidence.iter().map(|(first, _)| &first.sender)
    }
}
