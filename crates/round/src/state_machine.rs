use tmbft_types::{Round, Step, VoteData, VoteType};

use crate::event::Input;
use crate::output::Output;
use crate::state::{LockedValue, RoundState};
use crate::transition::Transition;

fn no_op(state: &RoundState) -> Transition {
    Transition::to(state.clone())
}

/// Applies `input` to `state`, per §4.H. Pure and total: every input either
/// produces a new state plus an optional output, or is recognized as a
/// no-op for the current state (e.g. a stale or already-handled event) and
/// returned unchanged with `valid: true`. `valid: false` is reserved for
/// inputs that violate a protocol invariant the driver should log (§4.H I3:
/// at most one proposal accepted per round).
pub fn apply(state: &RoundState, input: Input) -> Transition {
    match input {
        Input::NewRound { is_proposer, proposal } => {
            if !is_proposer {
                return Transition::to(state.clone())
                    .with_output(Output::ScheduleTimeout(tmbft_types::Timeout::propose(state.height, state.round)));
            }
            match proposal {
                Some((block, valid_round)) => {
                    let mut next = state.clone();
                    next.sent_proposal = true;
                    Transition::to(next).with_output(Output::Propose { valid_round, block })
                }
                None => Transition::to(state.clone()),
            }
        }

        Input::ProposeAvailableBlock(block) => {
            if state.step != Step::Propose || state.sent_proposal {
                return Transition::invalid(state.clone());
            }
            let mut next = state.clone();
            next.sent_proposal = true;
            Transition::to(next).with_output(Output::Propose {
                valid_round: Round::Nil,
                block,
            })
        }

        Input::Proposal { message, is_valid } => {
            if state.step != Step::Propose || state.proposal.is_some() {
                return Transition::invalid(state.clone());
            }
            let id = message.payload.block.id();
            let prevote_for = if is_valid
                && state
                    .locked_value
                    .is_none_or(|locked| locked.hash == id)
            {
                id
            } else {
                tmbft_types::BlockHash::NIL
            };

            let mut next = state.clone();
            next.proposal = Some(message);
            next.step = Step::Prevote;
            next.sent_prevote = true;
            Transition::to(next).with_output(Output::Vote(VoteData {
                vote_type: VoteType::Prevote,
                value: prevote_for,
            }))
        }

        Input::ProposalAndPolkaPrevious { message, is_valid } => {
            if state.step != Step::Propose || state.proposal.is_some() {
                return Transition::invalid(state.clone());
            }
            let id = message.payload.block.id();
            let vr = message.payload.valid_round;
            let prevote_for = if is_valid
                && state
                    .locked_value
                    .is_none_or(|locked| locked.round <= vr || locked.hash == id)
            {
                id
            } else {
                tmbft_types::BlockHash::NIL
            };

            let mut next = state.clone();
            next.proposal = Some(message);
            next.step = Step::Prevote;
            next.sent_prevote = true;
            Transition::to(next).with_output(Output::Vote(VoteData {
                vote_type: VoteType::Prevote,
                value: prevote_for,
            }))
        }

        Input::PolkaAny => {
            if state.step != Step::Prevote || state.prevote_timeout_scheduled {
                return no_op(state);
            }
            let mut next = state.clone();
            next.prevote_timeout_scheduled = true;
            Transition::to(next)
                .with_output(Output::ScheduleTimeout(tmbft_types::Timeout::prevote(state.height, state.round)))
        }

        Input::PolkaNil => {
            if state.step != Step::Prevote {
                return no_op(state);
            }
            let mut next = state.clone();
            next.step = Step::Precommit;
            next.sent_precommit = true;
            Transition::to(next).with_output(Output::Vote(VoteData {
                vote_type: VoteType::Precommit,
                value: tmbft_types::BlockHash::NIL,
            }))
        }

        Input::PolkaValue(hash) => {
            let already_valid_this_round = state
                .valid_value
                .is_some_and(|v| v.hash == hash && v.round == state.round);
            if already_valid_this_round {
                return no_op(state);
            }

            let mut next = state.clone();
            next.valid_value = Some(LockedValue {
                hash,
                round: state.round,
            });

            if state.step == Step::Prevote {
                next.locked_value = Some(LockedValue {
                    hash,
                    round: state.round,
                });
                next.step = Step::Precommit;
                next.sent_precommit = true;
                Transition::to(next).with_output(Output::Vote(VoteData {
                    vote_type: VoteType::Precommit,
                    value: hash,
                }))
            } else {
                Transition::to(next)
            }
        }

        Input::PrecommitAny => {
            if state.precommit_timeout_scheduled {
                return no_op(state);
            }
            let mut next = state.clone();
            next.precommit_timeout_scheduled = true;
            Transition::to(next)
                .with_output(Output::ScheduleTimeout(tmbft_types::Timeout::precommit(state.height, state.round)))
        }

        Input::PrecommitValue { value, round } => {
            Transition::to(state.clone()).with_output(Output::Decide { value, round })
        }

        Input::TimeoutPropose => {
            if state.step != Step::Propose {
                return no_op(state);
            }
            let mut next = state.clone();
            next.step = Step::Prevote;
            next.sent_prevote = true;
            Transition::to(next).with_output(Output::Vote(VoteData {
                vote_type: VoteType::Prevote,
                value: tmbft_types::BlockHash::NIL,
            }))
        }

        Input::TimeoutPrevote => {
            if state.step != Step::Prevote {
                return no_op(state);
            }
            let mut next = state.clone();
            next.step = Step::Precommit;
            next.sent_precommit = true;
            Transition::to(next).with_output(Output::Vote(VoteData {
                vote_type: VoteType::Precommit,
                value: tmbft_types::BlockHash::NIL,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmbft_types::{Block, Height, Signature, Signed};

    fn state() -> RoundState {
        RoundState::new_height(Height::new(1))
    }

    fn proposal(block: Block, valid_round: Round) -> tmbft_types::SignedProposal {
        Signed::new(
            Height::new(1),
            Round::new(0),
            tmbft_types::Address::new([1; tmbft_types::Address::LENGTH]),
            tmbft_types::ProposalData { valid_round, block },
            Signature::new(vec![]),
        )
    }

    #[test]
    fn fresh_proposal_valid_and_unlocked_votes_for_block() {
        let block = Block::new(vec![1, 2, 3]);
        let id = block.id();
        let t = apply(
            &state(),
            Input::Proposal {
                message: proposal(block, Round::Nil),
                is_valid: true,
            },
        );
        assert!(t.valid);
        assert_eq!(t.next_state.step, Step::Prevote);
        assert_eq!(
            t.output,
            Some(Output::Vote(VoteData {
                vote_type: VoteType::Prevote,
                value: id
            }))
        );
    }

    #[test]
    fn invalid_proposal_votes_nil() {
        let block = Block::new(vec![1, 2, 3]);
        let t = apply(
            &state(),
            Input::Proposal {
                message: proposal(block, Round::Nil),
                is_valid: false,
            },
        );
        assert_eq!(
            t.output,
            Some(Output::Vote(VoteData {
                vote_type: VoteType::Prevote,
                value: tmbft_types::BlockHash::NIL
            }))
        );
    }

    #[test]
    fn locked_on_different_value_votes_nil_scenario_3() {
        let mut s = state();
        let locked_block = Block::new(vec![9]);
        s.locked_value = Some(LockedValue {
            hash: locked_block.id(),
            round: Round::new(0),
        });

        let other_block = Block::new(vec![1, 2, 3]);
        let t = apply(
            &s,
            Input::Proposal {
                message: proposal(other_block, Round::Nil),
                is_valid: true,
            },
        );
        assert_eq!(
            t.output,
            Some(Output::Vote(VoteData {
                vote_type: VoteType::Prevote,
                value: tmbft_types::BlockHash::NIL
            }))
        );
    }

    #[test]
    fn second_proposal_same_round_is_rejected() {
        let block = Block::new(vec![1]);
        let t1 = apply(
            &state(),
            Input::Proposal {
                message: proposal(block.clone(), Round::Nil),
                is_valid: true,
            },
        );
        let t2 = apply(
            &t1.next_state,
            Input::Proposal {
                message: proposal(block, Round::Nil),
                is_valid: true,
            },
        );
        assert!(!t2.valid);
    }

    #[test]
    fn polka_any_schedules_timer_once() {
        let mut s = state();
        s.step = Step::Prevote;
        let t1 = apply(&s, Input::PolkaAny);
        assert!(t1.output.is_some());
        let t2 = apply(&t1.next_state, Input::PolkaAny);
        assert!(t2.output.is_none());
    }

    #[test]
    fn polka_value_locks_and_precommits_from_prevote_step() {
        let mut s = state();
        s.step = Step::Prevote;
        let hash = Block::new(vec![7]).id();
        let t = apply(&s, Input::PolkaValue(hash));
        assert_eq!(t.next_state.step, Step::Precommit);
        assert_eq!(
            t.next_state.locked_value,
            Some(LockedValue {
                hash,
                round: Round::new(0)
            })
        );
        assert_eq!(
            t.output,
            Some(Output::Vote(VoteData {
                vote_type: VoteType::Precommit,
                value: hash
            }))
        );
    }

    #[test]
    fn timeout_propose_votes_nil_and_advances_step() {
        let t = apply(&state(), Input::TimeoutPropose);
        assert_eq!(t.next_state.step, Step::Prevote);
        assert_eq!(
            t.output,
            Some(Output::Vote(VoteData {
                vote_type: VoteType::Prevote,
                value: tmbft_types::BlockHash::NIL
            }))
        );
    }

    #[test]
    fn precommit_value_emits_decision_from_any_step() {
        let hash = Block::new(vec![4]).id();
        let t = apply(
            &state(),
            Input::PrecommitValue {
                value: hash,
                round: Round::new(3),
            },
        );
        assert_eq!(
            t.output,
            Some(Output::Decide {
                value: hash,
                round: Round::new(3)
            })
        );
    }
}
