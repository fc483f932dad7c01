use bytes::{BufMut, BytesMut};
use tmbft_types::{
    Address, Block, BlockHash, Height, Message, MessageError, MsgCode, ProposalData, Round,
    Signature, SignedProposal, SignedVote, Step, VoteData, VoteType,
};

/// Encodes `message` to the wire form described in §6: `{code, height,
/// round, sender, payload_hash, signature}` followed by whatever bytes the
/// payload itself needs (a vote's bare value, or a proposal's block bytes
/// plus valid_round).
///
/// `bytes::BufMut` never panics on a write (the buffer grows as needed), so
/// encoding has no failure mode; only `decode` can fail, on attacker-chosen
/// input.
pub fn encode(message: &Message) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u8(message.code() as u8);
    buf.put_u64(message.height().as_u64());
    buf.put_i64(message.round().as_i64());
    buf.put_slice(message.sender().as_bytes());
    let signature = message.signature().as_bytes();
    buf.put_u32(signature.len() as u32);
    buf.put_slice(signature);

    match message {
        Message::Proposal(proposal) => {
            buf.put_i64(proposal.payload.valid_round.as_i64());
            let block = proposal.payload.block.bytes();
            buf.put_u32(block.len() as u32);
            buf.put_slice(block);
        }
        Message::Prevote(vote) | Message::Precommit(vote) => {
            buf.put_slice(vote.payload.value.as_bytes());
        }
    }

    buf.to_vec()
}

/// Decodes the wire form produced by [`encode`]. Never panics: every read
/// is bounds-checked and a truncated or malformed frame yields
/// [`MessageError::DecodeError`]/[`MessageError::InvalidMessageType`]
/// rather than an `unwrap`, since the input is attacker-controlled (§7).
pub fn decode(bytes: &[u8]) -> Result<Message, MessageError> {
    let mut cursor = Cursor::new(bytes);

    let code = cursor.take_u8().ok_or(MessageError::DecodeError(Step::Propose))?;
    let code = match code {
        0x00 => MsgCode::Proposal,
        0x01 => MsgCode::Prevote,
        0x02 => MsgCode::Precommit,
        other => return Err(MessageError::InvalidMessageType(other)),
    };
    let step = match code {
        MsgCode::Proposal => Step::Propose,
        MsgCode::Prevote => Step::Prevote,
        MsgCode::Precommit => Step::Precommit,
    };
    let decode_error = || MessageError::DecodeError(step);

    let height = Height::new(cursor.take_u64().ok_or_else(decode_error)?);
    let round = Round::new(cursor.take_i64().ok_or_else(decode_error)?);
    let sender = Address::new(cursor.take_bytes(Address::LENGTH).ok_or_else(decode_error)?.try_into().unwrap());
    let signature_len = cursor.take_u32().ok_or_else(decode_error)? as usize;
    let signature = Signature::new(cursor.take_bytes(signature_len).ok_or_else(decode_error)?.to_vec());

    match code {
        MsgCode::Proposal => {
            let valid_round = Round::new(cursor.take_i64().ok_or_else(decode_error)?);
            let block_len = cursor.take_u32().ok_or_else(decode_error)? as usize;
            let block = Block::new(cursor.take_bytes(block_len).ok_or_else(decode_error)?.to_vec());
            Ok(Message::Proposal(SignedProposal::new(
                height,
                round,
                sender,
                ProposalData { valid_round, block },
                signature,
            )))
        }
        MsgCode::Prevote | MsgCode::Precommit => {
            let value = BlockHash::new(cursor.take_bytes(BlockHash::LENGTH).ok_or_else(decode_error)?.try_into().unwrap());
            let vote_type = if code == MsgCode::Prevote { VoteType::Prevote } else { VoteType::Precommit };
            let vote = SignedVote::new(height, round, sender, VoteData { vote_type, value }, signature);
            Ok(if code == MsgCode::Prevote { Message::Prevote(vote) } else { Message::Precommit(vote) })
        }
    }
}

/// A bounds-checked forward-only reader: every `take_*` returns `None`
/// instead of panicking when the frame is shorter than it claims.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let slice = self.bytes.get(self.pos..self.pos + len)?;
        self.pos += len;
        Some(slice)
    }

    fn take_u8(&mut self) -> Option<u8> {
        self.take_bytes(1).map(|b| b[0])
    }

    fn take_u32(&mut self) -> Option<u32> {
        self.take_bytes(4).map(|b| u32::from_be_bytes(b.try_into().unwrap()))
    }

    fn take_u64(&mut self) -> Option<u64> {
        self.take_bytes(8).map(|b| u64::from_be_bytes(b.try_into().unwrap()))
    }

    fn take_i64(&mut self) -> Option<i64> {
        self.take_bytes(8).map(|b| i64::from_be_bytes(b.try_into().unwrap()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::new([b; Address::LENGTH])
    }

    #[test]
    fn proposal_round_trips() {
        let block = Block::new(vec![1, 2, 3, 4]);
        let message = Message::Proposal(SignedProposal::new(
            Height::new(7),
            Round::new(2),
            addr(9),
            ProposalData { valid_round: Round::new(1), block: block.clone() },
            Signature::new(vec![0xaa; 64]),
        ));

        let encoded = encode(&message);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn vote_round_trips() {
        let message = Message::Precommit(SignedVote::new(
            Height::new(3),
            Round::new(0),
            addr(1),
            VoteData { vote_type: VoteType::Precommit, value: BlockHash::NIL },
            Signature::new(vec![]),
        ));

        let encoded = encode(&message);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn truncated_frame_is_a_decode_error_not_a_panic() {
        let message = Message::Prevote(SignedVote::new(
            Height::new(1),
            Round::new(0),
            addr(1),
            VoteData { vote_type: VoteType::Prevote, value: BlockHash::NIL },
            Signature::new(vec![]),
        ));
        let encoded = encode(&message);

        for cut in 0..encoded.len() {
            assert!(decode(&encoded[..cut]).is_err());
        }
    }

    #[test]
    fn unknown_code_is_invalid_message_type() {
        let err = decode(&[0xff]).unwrap_err();
        assert!(matches!(err, MessageError::InvalidMessageType(0xff)));
    }
}
