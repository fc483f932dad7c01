use core::fmt;

/// The three steps of a Tendermint round.
///
/// There is deliberately no `Commit` variant: committing is an atomic
/// transition out of the height, not a step a round lingers in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    Propose,
    Prevote,
    Precommit,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Propose => write!(f, "propose"),
            Step::Prevote => write!(f, "prevote"),
            Step::Precommit => write!(f, "precommit"),
        }
    }
}
