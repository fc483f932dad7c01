//! The pure per-round Tendermint state machine, per §4.H. Consumes
//! [`Input`]s already resolved against committee/vote knowledge by the
//! driver and produces [`Output`]s for the driver to carry out.

mod event;
mod output;
mod state;
mod state_machine;
mod transition;

pub use event::Input;
pub use output::Output;
pub use state::{LockedValue, RoundState};
pub use state_machine::apply;
pub use transition::Transition;
