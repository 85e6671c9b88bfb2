//! MTProto user session for server-side search of the source channel.
//!
//! Bots cannot search chat history, so in `session = "user"` mode a user
//! account runs the `messages.search` query against the full history of the
//! source channel. Receiving queries, copying and deleting stay on the bot
//! session; the bot must still be able to read the source channel so that
//! `copyMessage` succeeds.

use std::sync::Arc;

use grammers_client::types::Chat;
use grammers_client::{Client, Config, InitParams, SignInError};
use grammers_session::{PackedChat, PackedType, Session};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use super::client::TelegramGateway;
use crate::config::{TelegramConfig, UserSessionConfig};
use crate::gateway::{Gateway, GatewayFuture};
use crate::models::{ChatId, ChatRef, Message, MessageId};
use crate::{AppError, Result};

/// Offset the Bot API adds to supergroup and channel ids.
const CHANNEL_ID_OFFSET: i64 = 1_000_000_000_000;

/// Translate an MTProto peer into the Bot API chat id the bot session uses.
#[must_use]
pub fn bot_api_chat_id(peer: PackedChat) -> ChatId {
    match peer.ty {
        PackedType::User | PackedType::Bot => ChatId(peer.id),
        PackedType::Chat => ChatId(-peer.id),
        PackedType::Megagroup | PackedType::Broadcast | PackedType::Gigagroup => {
            ChatId(-(CHANNEL_ID_OFFSET + peer.id))
        }
    }
}

/// Gateway pairing a user session (search) with the bot gateway (copy,
/// delete).
pub struct UserSessionGateway {
    user: Client,
    source: ChatRef,
    source_peer: PackedChat,
    source_id: ChatId,
    bot: Arc<TelegramGateway>,
}

impl UserSessionGateway {
    /// Connect the user session, logging in on first use, and resolve the
    /// source channel.
    ///
    /// The first login reads the code Telegram sends to `user.phone` (and
    /// the 2FA password, if the account has one) from stdin; the authorized
    /// session is then saved to `user.session_file`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the `[telegram.user]` section is
    /// missing, `AppError::Telegram` if connecting or logging in fails, and
    /// `AppError::NotFound` if the user cannot see the source channel.
    pub async fn connect(config: &TelegramConfig, bot: Arc<TelegramGateway>) -> Result<Self> {
        let settings = config
            .user
            .as_ref()
            .ok_or_else(|| AppError::Config("missing [telegram.user] section".into()))?;

        let session = Session::load_file_or_create(&settings.session_file).map_err(|err| {
            AppError::Config(format!(
                "failed to open session file {}: {err}",
                settings.session_file.display()
            ))
        })?;
        let user = Client::connect(Config {
            session,
            api_id: settings.api_id,
            api_hash: settings.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        .map_err(|err| AppError::Telegram(format!("user session connect: {err}")))?;

        if !user
            .is_authorized()
            .await
            .map_err(|err| AppError::Telegram(format!("user session check: {err}")))?
        {
            sign_in(&user, settings).await?;
        }

        let source_chat = resolve_source(&user, &config.source_channel).await?;
        let source_peer = source_chat.pack();
        let source_id = bot_api_chat_id(source_peer);
        info!(%source_id, "user session ready for source search");

        Ok(Self {
            user,
            source: config.source_channel.clone(),
            source_peer,
            source_id,
            bot,
        })
    }
}

async fn sign_in(user: &Client, settings: &UserSessionConfig) -> Result<()> {
    info!(phone = %settings.phone, "user session not authorized; requesting login code");
    let token = user
        .request_login_code(&settings.phone)
        .await
        .map_err(|err| AppError::Telegram(format!("request login code: {err}")))?;

    info!("enter the login code on stdin");
    let code = read_stdin_line().await?;
    match user.sign_in(&token, &code).await {
        Ok(_) => {}
        Err(SignInError::PasswordRequired(password_token)) => {
            info!("account has two-step verification; enter the password on stdin");
            let password = read_stdin_line().await?;
            user.check_password(password_token, password.as_bytes())
                .await
                .map_err(|err| AppError::Telegram(format!("password check: {err}")))?;
        }
        Err(err) => return Err(AppError::Telegram(format!("sign in: {err}"))),
    }

    user.session()
        .save_to_file(&settings.session_file)
        .map_err(|err| AppError::Config(format!("failed to save session file: {err}")))?;
    info!(path = %settings.session_file.display(), "user session saved");
    Ok(())
}

async fn read_stdin_line() -> Result<String> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    match lines.next_line().await {
        Ok(Some(line)) if !line.trim().is_empty() => Ok(line.trim().to_owned()),
        Ok(_) => Err(AppError::Config("no input on stdin".into())),
        Err(err) => Err(AppError::Config(format!("failed to read stdin: {err}"))),
    }
}

async fn resolve_source(user: &Client, source: &ChatRef) -> Result<Chat> {
    match source {
        ChatRef::Username(name) => user
            .resolve_username(name)
            .await
            .map_err(|err| AppError::Telegram(format!("resolve @{name}: {err}")))?
            .ok_or_else(|| AppError::NotFound(format!("source channel @{name}"))),
        // Numeric ids carry no access hash; find the channel among the
        // account's dialogs instead.
        ChatRef::Id(id) => {
            let mut dialogs = user.iter_dialogs();
            while let Some(dialog) = dialogs
                .next()
                .await
                .map_err(|err| AppError::Telegram(format!("list dialogs: {err}")))?
            {
                let chat = dialog.chat();
                if bot_api_chat_id(chat.pack()) == *id {
                    return Ok(chat.clone());
                }
            }
            Err(AppError::NotFound(format!(
                "source channel {id} is not among the user's dialogs"
            )))
        }
    }
}

impl Gateway for UserSessionGateway {
    fn search_messages<'a>(
        &'a self,
        chat: &'a ChatRef,
        query: &'a str,
        limit: usize,
    ) -> GatewayFuture<'a, Vec<Message>> {
        Box::pin(async move {
            if *chat != self.source {
                return Err(AppError::NotFound(format!("no user search for chat {chat}")));
            }
            let mut results = self
                .user
                .search_messages(self.source_peer)
                .query(query)
                .limit(limit);

            let mut found = Vec::new();
            while let Some(message) = results
                .next()
                .await
                .map_err(|err| AppError::Telegram(format!("messages.search: {err}")))?
            {
                found.push(Message {
                    id: MessageId(i64::from(message.id())),
                    chat_id: self.source_id,
                    text: Some(message.text().to_owned()),
                });
            }
            debug!(hits = found.len(), "source channel searched");
            Ok(found)
        })
    }

    fn copy_message(
        &self,
        target: ChatId,
        source: ChatId,
        message_id: MessageId,
    ) -> GatewayFuture<'_, Message> {
        self.bot.copy_message(target, source, message_id)
    }

    fn delete_messages<'a>(
        &'a self,
        chat: ChatId,
        message_ids: &'a [MessageId],
    ) -> GatewayFuture<'a, ()> {
        self.bot.delete_messages(chat, message_ids)
    }
}
