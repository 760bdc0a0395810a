//! Stop-Loss Engine Binary
//!
//! Starts a monitoring run against a Dhan account.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin stoploss-engine
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `DHAN_CLIENT_ID`: Dhan client ID
//! - `DHAN_ACCESS_TOKEN`: Dhan API access token
//!
//! ## Optional
//! - `STOP_LOSS_LIMIT`: Negative breach threshold in percent (default: -6.5)
//! - `AUTO_SELL_ENABLED`: Liquidate on breach instead of alerting (default: false)
//! - `ALERT_ONCE`: Alert once per breach episode in alert-only mode (default: false)
//! - `UPDATE_INTERVAL_SECS`: Seconds between cycles (default: 30)
//! - `RUN_DURATION_MINUTES`: Wall-clock ceiling (default: 360)
//! - `SESSION_CUTOFF`: Local HH:MM after which no cycle starts, or `none` (default: 15:30)
//! - `MAX_CONSECUTIVE_FAILURES`: Fetch failures before the circuit opens (default: 10)
//! - `ORDER_PACING_MS`: Delay between sell orders (default: 500)
//! - `QUOTE_SUFFIX`: Symbol suffix for the primary quote provider (default: .NS)
//! - `DHAN_BASE_URL`: API base URL override
//! - `RUST_LOG`: Log level (default: info)

use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use stoploss_engine::infrastructure::quotes::{QuoteChain, YahooFinanceProvider};
use stoploss_engine::{
    DhanBrokerAdapter, EngineConfig, ExitReason, PollLoopDriver, QuoteProviderPort,
};

#[tokio::main]
async fn main() -> ExitCode {
    load_dotenv();
    init_tracing();

    tracing::info!("Starting stop-loss engine");

    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Configuration error");
            return ExitCode::FAILURE;
        }
    };
    log_config(&config);

    match run(&config).await {
        Ok(exit) => {
            tracing::info!(exit = ?exit, "Stop-loss engine stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Stop-loss engine failed to start");
            ExitCode::FAILURE
        }
    }
}

/// Wire the adapters together and run the poll loop to completion.
async fn run(config: &EngineConfig) -> anyhow::Result<ExitReason> {
    let broker = Arc::new(DhanBrokerAdapter::new(&config.dhan())?);
    let yahoo = YahooFinanceProvider::new(&config.yahoo())?;

    // Primary quotes from Yahoo, backup LTP from the broker itself.
    let providers: Vec<Arc<dyn QuoteProviderPort>> =
        vec![Arc::new(yahoo), Arc::clone(&broker) as Arc<dyn QuoteProviderPort>];
    let quotes = Arc::new(QuoteChain::new(providers));

    let driver = PollLoopDriver::new(
        Arc::clone(&broker),
        quotes,
        config.state_machine(),
        config.poll_loop(),
    );

    let shutdown_token = CancellationToken::new();
    spawn_signal_handler(shutdown_token.clone());

    let summary = driver.run(shutdown_token).await;
    Ok(summary.exit)
}

/// Cancel the token on Ctrl-C so the loop exits between cycles.
fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutdown signal received");
        token.cancel();
    });
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Initialize the tracing subscriber with environment filter.
///
/// Uses a static directive string that is a compile-time constant guaranteed to parse.
#[allow(clippy::expect_used)]
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "stoploss_engine=info"
                    .parse()
                    .expect("static directive 'stoploss_engine=info' is valid"),
            ),
        )
        .init();
}

/// Log the parsed configuration, credentials excluded.
fn log_config(config: &EngineConfig) {
    tracing::info!(
        threshold = %config.stop_loss_limit,
        auto_sell = config.auto_sell,
        alert_once = config.alert_once,
        interval_secs = config.interval.as_secs(),
        run_duration_mins = config.run_duration.as_secs() / 60,
        session_cutoff = %config
            .session_cutoff
            .map_or_else(|| "none".to_string(), |t| t.format("%H:%M").to_string()),
        failure_ceiling = config.failure_ceiling,
        "Configuration loaded"
    );
}
