#![forbid(unsafe_code)]

//! `query-relay` — Telegram lookup relay binary.
//!
//! Loads configuration and credentials, starts the `getUpdates` poller and
//! the relay dispatch loop, and runs until Ctrl-C or SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use query_relay::config::{GlobalConfig, SessionMode};
use query_relay::gateway::Gateway;
use query_relay::relay::{self, RelayPipeline};
use query_relay::telegram::{poller, ChannelIndex, TelegramGateway, UserSessionGateway};
use query_relay::{AppError, Result};

const EVENT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "query-relay", about = "Telegram lookup relay", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("query-relay bootstrap");

    // One cooperative event loop drives dispatch and every cleanup task.
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    config.load_credentials().await?;
    info!(
        target_group = %config.telegram.target_group_id,
        source_channel = %config.telegram.source_channel,
        session = ?config.telegram.session,
        cleanup_delay_seconds = config.relay.cleanup_delay_seconds,
        "configuration loaded"
    );

    // ── Connect to Telegram ─────────────────────────────
    let index = Arc::new(ChannelIndex::new(config.relay.index_capacity));
    let telegram = Arc::new(TelegramGateway::new(&config.telegram, index)?);
    telegram.get_me().await?;

    let gateway: Arc<dyn Gateway> = match config.telegram.session {
        SessionMode::Bot => Arc::clone(&telegram) as Arc<dyn Gateway>,
        SessionMode::User => Arc::new(
            UserSessionGateway::connect(&config.telegram, Arc::clone(&telegram)).await?,
        ),
    };

    // ── Start poller and dispatch loop ──────────────────
    let ct = CancellationToken::new();
    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);

    let poller_handle = poller::spawn_update_poller(
        telegram,
        event_tx,
        config.telegram.polling_timeout_seconds,
        ct.clone(),
    );

    let pipeline = Arc::new(RelayPipeline::from_config(&config, gateway));
    let dispatch_handle = relay::spawn_dispatch(Arc::clone(&pipeline), event_rx, ct.clone());

    info!("relay ready");

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    let (poller_result, dispatch_result) = tokio::join!(poller_handle, dispatch_handle);
    relay::report_task_exit("telegram_poller", poller_result);
    relay::report_task_exit("dispatch", dispatch_result);

    // Pending deletions are not persisted; their copies stay in the group.
    let abandoned = pipeline.cleanup().in_flight();
    if abandoned > 0 {
        tracing::warn!(abandoned, "exiting with cleanup tasks still pending");
    }
    info!("query-relay shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
