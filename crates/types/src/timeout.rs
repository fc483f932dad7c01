use core::fmt;

use crate::{Height, Round};

/// The round step a timeout is scheduled for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TimeoutStep {
    Propose,
    Prevote,
    Precommit,
}

/// A timeout for a round step, tagged with the `(height, round)` it was
/// scheduled for, per §4.E.
///
/// The dispatcher compares this tag against the current round state before
/// acting on a delivered timeout event, so a timeout that fires after the
/// round (or height) has already moved on is silently dropped rather than
/// mis-applied.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Timeout {
    pub height: Height,
    pub round: Round,
    pub step: TimeoutStep,
}

impl Timeout {
    pub const fn new(height: Height, round: Round, step: TimeoutStep) -> Self {
        Self { height, round, step }
    }

    pub const fn propose(height: Height, round: Round) -> Self {
        Self::new(height, round, TimeoutStep::Propose)
    }

    pub const fn prevote(height: Height, round: Round) -> Self {
        Self::new(height, round, TimeoutStep::Prevote)
    }

    pub const fn precommit(height: Height, round: Round) -> Self {
        Self::new(height, round, TimeoutStep::Precommit)
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}Timeout(height={}, round={})", self.step, self.height, self.round)
    }
}
