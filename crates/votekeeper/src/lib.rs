//! Per-round, per-step vote aggregation and quorum threshold tracking, per
//! §4.C/§4.D.

mod keeper;
mod message_set;
mod round_votes;
mod threshold;

pub use keeper::VoteKeeper;
pub use message_set::MessageSet;
pub use round_votes::RoundVotes;
pub use threshold::{is_quorum, Threshold};
