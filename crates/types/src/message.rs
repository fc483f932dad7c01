use core::fmt;

use crate::{Address, BlockHash, Height, Round};

/// An opaque signature, recovered/verified by the backend (§6 of the spec:
/// `check_validator_signature`/`sign`). The core never interprets the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({} bytes)", self.0.len())
    }
}

/// The wire code identifying a message variant, per §6.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgCode {
    Proposal = 0x00,
    Prevote = 0x01,
    Precommit = 0x02,
}

/// The unsigned content of a proposal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalData {
    /// The round whose 2f+1 prevotes back this value, or `Round::Nil` if
    /// this is a fresh proposal with no such proof of lock.
    pub valid_round: Round,
    pub block: crate::Block,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VoteType {
    Prevote,
    Precommit,
}

/// The unsigned content of a prevote or precommit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VoteData {
    pub vote_type: VoteType,
    /// `BlockHash::NIL` encodes a nil vote.
    pub value: BlockHash,
}

impl VoteData {
    pub fn value_or_nil(&self) -> Option<BlockHash> {
        if self.value.is_nil() {
            None
        } else {
            Some(self.value)
        }
    }
}

/// A signed message envelope shared by all three message kinds: every
/// message references a specific `(height, round)` and carries the sender
/// derived from signature recovery plus the recovered signature itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signed<T> {
    pub height: Height,
    pub round: Round,
    pub sender: Address,
    pub payload: T,
    pub signature: Signature,
}

impl<T> Signed<T> {
    pub fn new(height: Height, round: Round, sender: Address, payload: T, signature: Signature) -> Self {
        Self {
            height,
            round,
            sender,
            payload,
            signature,
        }
    }
}

pub type SignedProposal = Signed<ProposalData>;
pub type SignedVote = Signed<VoteData>;

/// The tagged union of the three message kinds the core exchanges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Proposal(SignedProposal),
    Prevote(SignedVote),
    Precommit(SignedVote),
}

impl Message {
    pub fn code(&self) -> MsgCode {
        match self {
            Message::Proposal(_) => MsgCode::Proposal,
            Message::Prevote(_) => MsgCode::Prevote,
            Message::Precommit(_) => MsgCode::Precommit,
        }
    }

    pub fn height(&self) -> Height {
        match self {
            Message::Proposal(m) => m.height,
            Message::Prevote(m) => m.height,
            Message::Precommit(m) => m.height,
        }
    }

    pub fn round(&self) -> Round {
        match self {
            Message::Proposal(m) => m.round,
            Message::Prevote(m) => m.round,
            Message::Precommit(m) => m.round,
        }
    }

    pub fn sender(&self) -> Address {
        match self {
            Message::Proposal(m) => m.sender,
            Message::Prevote(m) => m.sender,
            Message::Precommit(m) => m.sender,
        }
    }

    pub fn signature(&self) -> &Signature {
        match self {
            Message::Proposal(m) => &m.signature,
            Message::Prevote(m) => &m.signature,
            Message::Precommit(m) => &m.signature,
        }
    }

    /// The canonical byte encoding signed over and verified: an ordered list
    /// of `[round, height, ...payload]`, per §4.B. Used both to produce the
    /// bytes a backend signs and to recompute what a recovered signature
    /// must have covered.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.round().as_i64().to_be_bytes());
        buf.extend_from_slice(&self.height().as_u64().to_be_bytes());
        match self {
            Message::Proposal(m) => {
                buf.push(MsgCode::Proposal as u8);
                buf.extend_from_slice(&m.payload.valid_round.as_i64().to_be_bytes());
                buf.extend_from_slice(m.payload.block.id().as_bytes());
            }
            Message::Prevote(m) => {
                buf.push(MsgCode::Prevote as u8);
                buf.extend_from_slice(m.payload.value.as_bytes());
            }
            Message::Precommit(m) => {
                buf.push(MsgCode::Precommit as u8);
                buf.extend_from_slice(m.payload.value.as_bytes());
            }
        }
        buf
    }
}
