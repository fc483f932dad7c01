use crate::output::Output;
use crate::state::RoundState;

/// The result of applying an [`crate::Input`] to a [`RoundState`]: the next
/// state, an optional effect for the driver to carry out, and whether the
/// input was accepted (an invalid transition still needs a next state so
/// the driver can keep the old one).
pub struct Transition {
    pub next_state: RoundState,
    pub output: Option<Output>,
    pub valid: bool,
}

impl Transition {
    pub fn to(next_state: RoundState) -> Self {
        Self {
            next_state,
            output: None,
            valid: true,
        }
    }

    pub fn invalid(next_state: RoundState) -> Self {
        Self {
            next_state,
            output: None,
            valid: false,
        }
    }

    pub fn with_output(mut self, output: Output) -> Self {
        self.output = Some(output);
        self
    }
}
