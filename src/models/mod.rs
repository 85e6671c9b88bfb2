//! Domain model module declarations.

pub mod chat;
pub mod relay;

pub use chat::{ChatId, ChatRef, Message, MessageId};
pub use relay::{
    CleanupState, CleanupTask, IncomingEvent, MatchCandidate, RelayResult, SearchQuery,
};
