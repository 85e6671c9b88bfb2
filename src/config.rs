//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::models::{ChatId, ChatRef};
use crate::{AppError, Result};

const KEYRING_SERVICE: &str = "query-relay";
const BOT_TOKEN_KEY: &str = "telegram_bot_token";
const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
const API_HASH_KEY: &str = "telegram_api_hash";
const API_HASH_ENV: &str = "TELEGRAM_API_HASH";

/// Longest long-poll timeout the Bot API honours.
const MAX_POLLING_TIMEOUT_SECONDS: u32 = 50;

/// Which Telegram sessions the relay runs.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Bot session only. Search is served from the in-memory index of
    /// source posts the bot has seen.
    #[default]
    Bot,
    /// User session for server-side search of the full source history,
    /// bot session for receiving queries, copying and deleting.
    User,
}

/// Where secrets (bot token, user `api_hash`) are read from at startup.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// OS keychain first, then the environment variable.
    #[default]
    Keychain,
    /// Only the environment variable.
    Env,
}

/// MTProto user session settings, required when `session = "user"`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct UserSessionConfig {
    /// Application id from my.telegram.org.
    pub api_id: i32,
    /// Phone number of the account, used for the first login only.
    pub phone: String,
    /// File holding the authorized session between runs.
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
    /// Application hash (populated at runtime).
    #[serde(skip)]
    pub api_hash: String,
}

fn default_session_file() -> PathBuf {
    PathBuf::from("query-relay.session")
}

/// Telegram connectivity and chat routing.
///
/// The bot token is loaded at runtime via OS keychain or environment
/// variable, never from the TOML file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TelegramConfig {
    /// Group whose messages are treated as queries.
    pub target_group_id: ChatId,
    /// Channel searched for matches and copied from.
    pub source_channel: ChatRef,
    /// Session mode: bot only, or user search plus bot relay.
    #[serde(default)]
    pub session: SessionMode,
    /// Credential strategy for secrets.
    #[serde(default)]
    pub credentials: CredentialSource,
    /// User session settings for `session = "user"`.
    #[serde(default)]
    pub user: Option<UserSessionConfig>,
    /// Bot API base URL, without the `/bot<token>` suffix.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Long-poll timeout passed to `getUpdates`.
    #[serde(default = "default_polling_timeout")]
    pub polling_timeout_seconds: u32,
    /// Bot token (populated at runtime).
    #[serde(skip)]
    pub bot_token: String,
}

fn default_api_base() -> String {
    "https://api.telegram.org".into()
}

fn default_polling_timeout() -> u32 {
    30
}

/// Relay policy knobs.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RelayConfig {
    /// Grace period before a trigger/copy pair is deleted.
    #[serde(default = "default_cleanup_delay")]
    pub cleanup_delay_seconds: u64,
    /// Maximum number of source-channel posts kept in the search index.
    #[serde(default = "default_index_capacity")]
    pub index_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            cleanup_delay_seconds: default_cleanup_delay(),
            index_capacity: default_index_capacity(),
        }
    }
}

fn default_cleanup_delay() -> u64 {
    600
}

fn default_index_capacity() -> usize {
    10_000
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Telegram connectivity settings.
    pub telegram: TelegramConfig,
    /// Relay policy.
    #[serde(default)]
    pub relay: RelayConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the bot token, and the user `api_hash` in user mode, according
    /// to `telegram.credentials`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if no source provides a secret.
    pub async fn load_credentials(&mut self) -> Result<()> {
        let source = self.telegram.credentials;
        self.telegram.bot_token = load_secret(source, BOT_TOKEN_KEY, BOT_TOKEN_ENV).await?;
        if self.telegram.session == SessionMode::User {
            if let Some(user) = self.telegram.user.as_mut() {
                user.api_hash = load_secret(source, API_HASH_KEY, API_HASH_ENV).await?;
            }
        }
        Ok(())
    }

    /// Delay between a relay and the deletion of its trigger/copy pair.
    #[must_use]
    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_secs(self.relay.cleanup_delay_seconds)
    }

    fn validate(&mut self) -> Result<()> {
        if self.telegram.target_group_id.0 == 0 {
            return Err(AppError::Config("target_group_id must be non-zero".into()));
        }

        if matches!(self.telegram.source_channel, ChatRef::Id(ChatId(0))) {
            return Err(AppError::Config("source_channel must be non-zero".into()));
        }

        if self.telegram.polling_timeout_seconds > MAX_POLLING_TIMEOUT_SECONDS {
            return Err(AppError::Config(format!(
                "polling_timeout_seconds must be at most {MAX_POLLING_TIMEOUT_SECONDS}"
            )));
        }

        if self.relay.cleanup_delay_seconds == 0 {
            return Err(AppError::Config(
                "cleanup_delay_seconds must be greater than zero".into(),
            ));
        }

        if self.relay.index_capacity == 0 {
            return Err(AppError::Config(
                "index_capacity must be greater than zero".into(),
            ));
        }

        match (self.telegram.session, &self.telegram.user) {
            (SessionMode::User, None) => {
                return Err(AppError::Config(
                    "session = \"user\" requires a [telegram.user] section".into(),
                ));
            }
            (SessionMode::User, Some(user)) => {
                if user.api_id <= 0 {
                    return Err(AppError::Config("user.api_id must be positive".into()));
                }
                if user.phone.trim().is_empty() {
                    return Err(AppError::Config("user.phone must not be empty".into()));
                }
            }
            (SessionMode::Bot, _) => {}
        }

        let trimmed = self.telegram.api_base.trim_end_matches('/');
        if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
            return Err(AppError::Config(format!(
                "api_base must be an http(s) URL: {}",
                self.telegram.api_base
            )));
        }
        self.telegram.api_base = trimmed.to_owned();

        Ok(())
    }
}

async fn load_secret(source: CredentialSource, keyring_key: &str, env_key: &str) -> Result<String> {
    match source {
        CredentialSource::Keychain => load_credential(keyring_key, env_key).await,
        CredentialSource::Env => load_env_credential(env_key),
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    load_env_credential(env_key).map_err(|_| {
        AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))
    })
}

fn load_env_credential(env_key: &str) -> Result<String> {
    match env::var(env_key) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_owned()),
        _ => Err(AppError::Config(format!(
            "credential not found in {env_key} env var"
        ))),
    }
}
