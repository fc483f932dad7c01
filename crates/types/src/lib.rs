//! Core datatypes shared by every other crate in the consensus engine:
//! addresses, heights, rounds, steps, timeouts and the signed message
//! envelope. Deliberately free of any consensus *logic* — see
//! `tmbft-round`/`tmbft-driver` for that.

mod address;
mod error;
mod message;
mod round;
mod step;
mod timeout;
mod value;

mod height;

pub use address::Address;
pub use error::MessageError;
pub use height::Height;
pub use message::{
    Message, MsgCode, ProposalData, Signature, Signed, SignedProposal, SignedVote, VoteData,
    VoteType,
};
pub use round::Round;
pub use step::Step;
pub use timeout::{Timeout, TimeoutStep};
pub use value::{Block, BlockHash};
