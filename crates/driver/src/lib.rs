//! Drives one height's consensus state forward: committee lookups, vote
//! aggregation, proposal bookkeeping and the backlog, feeding `tmbft-round`
//! the already-resolved [`Input`](tmbft_round::Input)s it needs, per
//! §4.F/§4.H.

mod backlog;
mod driver;
mod output;
mod proposal_keeper;

pub use backlog::Backlog;
pub use driver::Driver;
pub use output::Output;
