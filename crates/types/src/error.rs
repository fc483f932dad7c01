use displaydoc::Display;

use crate::{Height, Round, Step};

/// Errors surfaced while decoding or admitting a message, per §7 of the spec.
#[derive(Debug, Display, thiserror::Error)]
pub enum MessageError {
    /// malformed {0} payload
    DecodeError(Step),
    /// recovered sender does not match the claimed signature
    InvalidSignature,
    /// sender is not a committee member at height {0}
    Unauthorized(Height),
    /// message is for a future height {0}
    FutureHeight(Height),
    /// message is for a future round {0} of the current height
    FutureRound(Round),
    /// message is for a past height or round, current is ({0}, {1})
    OldMessage(Height, Round),
    /// unknown message code {0}
    InvalidMessageType(u8),
}
