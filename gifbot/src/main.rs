use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use gifbot::config::AppConfig;
use gifbot::logging::{filter_directive, init_logging};
use gifbot::pipeline::FfmpegConverter;
use gifbot::services::{DEFAULT_SHUTDOWN_TIMEOUT, ServiceContainer};
use gifbot::telegram::TelegramBot;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "GIFBOT_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory for log files (overrides logging.dir)
    #[arg(long, env = "GIFBOT_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let log_dir = args.log_dir.clone().unwrap_or_else(|| config.logging.dir.clone());
    let directive = filter_directive(
        args.verbose,
        std::env::var("RUST_LOG").ok().as_deref(),
        &config.logging.filter,
    );
    let logging = init_logging(&log_dir, &directive, config.logging.retention_days)
        .context("Failed to initialize logging")?;
    gifbot::panic_hook::install();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting gifbot");

    FfmpegConverter::new(
        &config.processing.ffmpeg_path,
        &config.processing.ffprobe_path,
        config.gif.clone(),
    )
    .check_available()
    .await
    .context("FFmpeg is required; install it or set processing.ffmpeg_path")?;

    let bot = Arc::new(TelegramBot::new(&config.bot.api_url, &config.bot.token)?);
    let me = bot.get_me().await.context("Failed to connect to Telegram")?;
    info!(
        username = me.username.as_deref().unwrap_or(&me.first_name),
        "Bot connected"
    );

    let container = ServiceContainer::new(config, bot)?;
    let cancellation_token = container.cancellation_token();
    let retention = logging.start_retention_cleanup(cancellation_token.clone());
    container.start();

    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, stopping bot");
        cancellation_token.cancel();
    });

    container.run().await;
    container.shutdown_with_timeout(DEFAULT_SHUTDOWN_TIMEOUT).await?;
    if let Some(handle) = retention {
        let _ = handle.await;
    }

    info!("Bot stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
