use std::collections::BTreeMap;

use tmbft_committee::CommitteeSet;
use tmbft_round::{Input, LockedValue, RoundState};
use tmbft_types::{
    Address, Block, BlockHash, Height, Message, Round, SignedProposal, SignedVote, Step, Timeout,
    TimeoutStep, VoteType,
};
use tmbft_votekeeper::{Threshold, VoteKeeper};

use crate::output::Output;
use crate::proposal_keeper::ProposalKeeper;
use crate::Backlog;

/// Wires [`CommitteeSet`], [`VoteKeeper`], [`ProposalKeeper`] and the pure
/// `tmbft-round` state machine together into the single-writer consensus
/// state for one height, per §4.H/§4.F.
///
/// `Driver` performs every lookup the round state machine itself cannot —
/// proposer identity, vote quorums, matching-proposal checks — and turns
/// the result into [`Input`]s for `tmbft_round::apply`. It is pure: it owns
/// no timers, no sockets and no signing key; the engine crate drives it
/// from the dispatcher loop and supplies externally-verified messages.
pub struct Driver {
    address: Address,
    committee: CommitteeSet,
    round_state: RoundState,
    vote_keeper: VoteKeeper,
    proposals: ProposalKeeper,
    backlog: Backlog,
    known_blocks: BTreeMap<BlockHash, Block>,
    latest_pending_block: Option<Block>,
}

impl Driver {
    pub fn new(height: Height, committee: CommitteeSet, address: Address) -> Self {
        Self {
            vote_keeper: VoteKeeper::new(height, committee.total_voting_power()),
            round_state: RoundState::new_height(height),
            committee,
            address,
            proposals: ProposalKeeper::new(),
            backlog: Backlog::new(),
            known_blocks: BTreeMap::new(),
            latest_pending_block: None,
        }
    }

    pub fn height(&self) -> Height {
        self.round_state.height
    }

    pub fn round(&self) -> Round {
        self.round_state.round
    }

    pub fn step(&self) -> Step {
        self.round_state.step
    }

    pub fn committee(&self) -> &CommitteeSet {
        &self.committee
    }

    pub fn locked_value(&self) -> Option<LockedValue> {
        self.round_state.locked_value
    }

    pub fn block_for(&self, hash: &BlockHash) -> Option<&Block> {
        self.known_blocks.get(hash)
    }

    /// The precommits on record for `(round, hash)` — the seal set a
    /// commit output is backed by.
    pub fn committed_seals(&self, round: Round, hash: &BlockHash) -> Vec<&SignedVote> {
        self.vote_keeper.round(round).map(|rv| rv.precommits.values(hash)).unwrap_or_default()
    }

    pub fn equivocators(&self) -> impl Iterator<Item = &Address> {
        self.proposals.equivocators()
    }

    fn feed(&mut self, input: Input) -> Vec<Output> {
        let transition = tmbft_round::apply(&self.round_state, input);
        self.round_state = transition.next_state;
        match transition.output {
            None => vec![],
            Some(tmbft_round::Output::Propose { valid_round, block }) => {
                self.known_blocks.insert(block.id(), block.clone());
                let round = self.round_state.round;
                let mut outputs = vec![Output::Propose { round, valid_round, block: block.clone() }];
                // The proposer applies the same "on proposal" rule to its own
                // value rather than waiting for a round trip over the wire.
                let own_proposal = SignedProposal::new(
                    self.round_state.height,
                    round,
                    self.address,
                    tmbft_types::ProposalData { valid_round, block },
                    tmbft_types::Signature::new(vec![]),
                );
                outputs.extend(self.apply_proposal_at_current_round(own_proposal, true));
                outputs
            }
            Some(tmbft_round::Output::Vote(vote)) => {
                let round = self.round_state.round;
                let mut outputs = vec![Output::Vote { round, vote_type: vote.vote_type, value: vote.value }];
                // Our own vote counts toward quorum just like a peer's; apply
                // it to the vote keeper rather than waiting to hear it back.
                let own_vote =
                    SignedVote::new(self.round_state.height, round, self.address, vote, tmbft_types::Signature::new(vec![]));
                outputs.extend(self.handle_vote(vote.vote_type, own_vote));
                outputs
            }
            Some(tmbft_round::Output::ScheduleTimeout(timeout)) => vec![Output::ScheduleTimeout(timeout)],
            Some(tmbft_round::Output::Decide { value, round }) => vec![Output::Decide { round, value }],
        }
    }

    /// Enters `round`, per §4.H `start_round`: resets per-round latches
    /// while preserving `locked_value`/`valid_value`, proposes if this node
    /// is the round's proposer and already has something to propose, and
    /// drains any backlog entries now satisfied.
    pub fn start_round(&mut self, round: Round) -> Vec<Output> {
        self.round_state = self.round_state.with_new_round(round);
        self.backlog.clear_up_to(round);

        let is_proposer = self.committee.proposer(round).address == self.address;
        let proposal = if is_proposer {
            match self.round_state.valid_value {
                Some(valid) => self.known_blocks.get(&valid.hash).cloned().map(|block| (block, valid.round)),
                None => self.latest_pending_block.clone().map(|block| (block, Round::Nil)),
            }
        } else {
            None
        };

        let mut outputs = self.feed(Input::NewRound { is_proposer, proposal });
        outputs.extend(self.drain_backlog());
        outputs
    }

    fn drain_backlog(&mut self) -> Vec<Output> {
        let mut outputs = Vec::new();
        for message in self.backlog.drain(self.round_state.height, self.round_state.round) {
            outputs.extend(match message {
                Message::Proposal(proposal) => self.handle_proposal(proposal, true),
                Message::Prevote(vote) => self.handle_vote(VoteType::Prevote, vote),
                Message::Precommit(vote) => self.handle_vote(VoteType::Precommit, vote),
            });
        }
        outputs
    }

    /// Re-checks whether the current round's prevotes already satisfy a
    /// threshold the driver has not yet raised to the state machine — moved
    /// here so both a newly-arrived vote and a newly-arrived (and therefore
    /// newly matchable) proposal trigger the same derivation.
    fn check_prevote_quorum(&mut self) -> Vec<Output> {
        let round = self.round_state.round;
        let Some(round_votes) = self.vote_keeper.round(round) else {
            return vec![];
        };
        let any = round_votes.prevotes.is_threshold_met(Threshold::Any);
        let nil = round_votes.prevotes.is_threshold_met(Threshold::Nil);
        let value = self.proposals.get(round).map(|p| p.payload.block.id()).filter(|hash| {
            self.vote_keeper.round(round).is_some_and(|rv| rv.prevotes.is_threshold_met(Threshold::Value(*hash)))
        });

        let mut outputs = Vec::new();
        if any {
            outputs.extend(self.feed(Input::PolkaAny));
        }
        if nil {
            outputs.extend(self.feed(Input::PolkaNil));
        }
        if let Some(hash) = value {
            outputs.extend(self.feed(Input::PolkaValue(hash)));
        }
        outputs
    }

    fn check_precommit_quorum(&mut self) -> Vec<Output> {
        let round = self.round_state.round;
        if self.vote_keeper.round(round).is_some_and(|rv| rv.precommits.is_threshold_met(Threshold::Any)) {
            self.feed(Input::PrecommitAny)
        } else {
            vec![]
        }
    }

    /// The commit rule applies at any step, any round of the height, per
    /// §4.H: 2f+1 precommits for `id(v)` with a matching proposal on record
    /// at `round` decide the height regardless of where the driver
    /// currently is.
    fn check_commit(&mut self, round: Round) -> Vec<Output> {
        let Some(proposal) = self.proposals.get(round) else {
            return vec![];
        };
        let hash = proposal.payload.block.id();
        if self.vote_keeper.round(round).is_some_and(|rv| rv.precommits.is_threshold_met(Threshold::Value(hash))) {
            self.feed(Input::PrecommitValue { value: hash, round })
        } else {
            vec![]
        }
    }

    pub fn handle_proposal(&mut self, proposal: SignedProposal, is_valid: bool) -> Vec<Output> {
        if proposal.height < self.height() {
            tracing::debug!(height = %proposal.height, "dropping proposal for old height");
            return vec![];
        }
        if proposal.height > self.height() {
            self.backlog.offer_future_height(Message::Proposal(proposal));
            return vec![];
        }
        if proposal.round > self.round_state.round {
            let round = proposal.round;
            self.backlog.offer(Message::Proposal(proposal));
            return self.catch_up_if_f_plus_1(round);
        }
        if proposal.round < self.round_state.round {
            tracing::trace!(round = %proposal.round, "dropping proposal for a round we've moved past");
            return vec![];
        }

        let proposer = self.committee.proposer(proposal.round).address;
        if proposal.sender != proposer {
            tracing::debug!(sender = %proposal.sender, "rejecting proposal from a non-proposer");
            return vec![];
        }

        self.apply_proposal_at_current_round(proposal, is_valid)
    }

    /// The part of `handle_proposal` shared with self-delivery of our own
    /// proposal: record it, resolve it to the right round-machine input
    /// (plain vs. carrying a proof of lock), and re-check thresholds it may
    /// newly satisfy. Assumes the proposal already belongs to the current
    /// round and comes from that round's proposer.
    fn apply_proposal_at_current_round(&mut self, proposal: SignedProposal, is_valid: bool) -> Vec<Output> {
        if self.proposals.record(proposal.clone()) {
            tracing::warn!(sender = %proposal.sender, "conflicting proposal recorded as evidence");
        }
        self.known_blocks.insert(proposal.payload.block.id(), proposal.payload.block.clone());

        let valid_round = proposal.payload.valid_round;
        let round = proposal.round;
        let input = if valid_round.is_nil() {
            Some(Input::Proposal { message: proposal.clone(), is_valid })
        } else if valid_round < round
            && self
                .vote_keeper
                .round(valid_round)
                .is_some_and(|rv| rv.prevotes.is_threshold_met(Threshold::Value(proposal.payload.block.id())))
        {
            Some(Input::ProposalAndPolkaPrevious { message: proposal.clone(), is_valid })
        } else {
            None
        };

        let mut outputs = Vec::new();
        if let Some(input) = input {
            outputs.extend(self.feed(input));
        }
        outputs.extend(self.check_prevote_quorum());
        outputs.extend(self.check_commit(round));
        outputs
    }

    pub fn handle_vote(&mut self, vote_type: VoteType, vote: SignedVote) -> Vec<Output> {
        if vote.height < self.height() {
            tracing::debug!(height = %vote.height, "dropping vote for old height");
            return vec![];
        }
        if vote.height > self.height() {
            self.backlog.offer_future_height(wrap(vote_type, vote));
            return vec![];
        }
        if vote.round > self.round_state.round {
            let round = vote.round;
            self.backlog.offer(wrap(vote_type, vote));
            return self.catch_up_if_f_plus_1(round);
        }

        let weight = self.committee.get_by_address(&vote.sender).map_or(0, |(_, m)| m.voting_power);
        let round = vote.round;
        self.vote_keeper.apply(vote_type, vote, weight);

        let mut outputs = Vec::new();
        match vote_type {
            VoteType::Precommit => {
                outputs.extend(self.check_commit(round));
                if round == self.round_state.round {
                    outputs.extend(self.check_precommit_quorum());
                }
            }
            VoteType::Prevote if round == self.round_state.round => {
                outputs.extend(self.check_prevote_quorum());
            }
            VoteType::Prevote => {}
        }
        outputs
    }

    pub fn handle_timeout(&mut self, timeout: Timeout) -> Vec<Output> {
        if timeout.height != self.height() || timeout.round != self.round_state.round {
            tracing::trace!(%timeout, "dropping stale timeout");
            return vec![];
        }
        match timeout.step {
            TimeoutStep::Propose if self.round_state.step == Step::Propose => self.feed(Input::TimeoutPropose),
            TimeoutStep::Prevote if self.round_state.step == Step::Prevote => self.feed(Input::TimeoutPrevote),
            TimeoutStep::Precommit => self.start_round(timeout.round.increment()),
            _ => vec![],
        }
    }

    pub fn handle_new_unmined_block(&mut self, block: Block) -> Vec<Output> {
        self.latest_pending_block = Some(block.clone());
        let is_proposer = self.committee.proposer(self.round_state.round).address == self.address;
        if self.round_state.step == Step::Propose && !self.round_state.sent_proposal && is_proposer {
            self.known_blocks.insert(block.id(), block.clone());
            self.feed(Input::ProposeAvailableBlock(block))
        } else {
            vec![]
        }
    }

    /// Moves to `height + 1` with a freshly supplied committee, per §4.J
    /// (membership updates are observed only on entering a height), then
    /// immediately starts round 0.
    pub fn advance_height(&mut self, committee: CommitteeSet) -> Vec<Output> {
        let old_height = self.round_state.height;
        let next_height = old_height.increment();

        self.committee = committee;
        self.round_state = RoundState::new_height(next_height);
        self.vote_keeper = VoteKeeper::new(next_height, self.committee.total_voting_power());
        self.proposals = ProposalKeeper::new();
        self.known_blocks.clear();
        self.latest_pending_block = None;
        self.backlog.clear_height(old_height);

        self.start_round(Round::INITIAL)
    }

    fn catch_up_if_f_plus_1(&mut self, round: Round) -> Vec<Output> {
        if self.backlog.distinct_senders(round) as u64 > self.committee.f() {
            self.start_round(round)
        } else {
            vec![]
        }
    }
}

fn wrap(vote_type: VoteType, vote: SignedVote) -> Message {
    match vote_type {
        VoteType::Prevote => Message::Prevote(vote),
        VoteType::Precommit => Message::Precommit(vote),
    }
}
