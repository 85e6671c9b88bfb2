//! Telegram integration: Bot API gateway client, update poller, the
//! source-channel search index, and the optional user session for
//! server-side search.

pub mod client;
pub mod index;
pub mod poller;
pub mod types;
pub mod user;

pub use client::TelegramGateway;
pub use index::ChannelIndex;
pub use user::UserSessionGateway;
