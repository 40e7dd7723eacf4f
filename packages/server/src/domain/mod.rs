//! Domain layer: identifiers, events, errors and the collaborator interfaces
//! the hub consumes.

mod collaborator;
mod error;
mod event;
mod presence;
mod value_object;

pub use collaborator::{
    Authenticator, ChatAccess, MessageProcessor, NewMessage, PersistedMessage, ReadReceipt,
    ReadReceiptRecord,
};
#[cfg(test)]
pub use collaborator::{MockChatAccess, MockMessageProcessor};
pub use error::{AuthError, ErrorCode, ProcessError, ProtocolError};
pub use event::{InboundEvent, OutboundEnvelope, OutboundEvent, StampedEvent};
pub use presence::PresenceStatus;
pub use value_object::{ChatId, ConnectionId, MessageId, UserId};
