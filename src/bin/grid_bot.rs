//! Grid Trading Bot Binary
//!
//! Runs a grid on Apex Omni until Ctrl-C or SIGTERM, then cancels every order
//! on the symbol and prints the final balance.
//!
//! ## Setup
//!
//! 1. Create a `.env` file in the project root:
//!    ```text
//!    APEX_API_KEY=your_key
//!    APEX_API_SECRET=your_secret
//!    APEX_API_PASSPHRASE=your_passphrase
//!    ```
//!
//! 2. Run the bot:
//!    ```bash
//!    cargo run --bin grid_bot -- --config config.toml
//!    ```
//!    Without `--config` a small BTC-USDT testnet grid is used.

use std::env;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::oneshot;

use apex_omni_sdk::{
    config::{LogConfig, NetworkConfig, Settings},
    grid::{ApexExchange, GridConfig, GridRunner, RunnerConfig},
    Account, Credentials,
};

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();

    // Parse arguments
    let args: Vec<String> = env::args().collect();
    let settings = if args.len() > 2 && args[1] == "--config" {
        match Settings::new(&args[2]) {
            Ok(settings) => settings,
            Err(e) => {
                LogConfig::default().init_logger();
                error!("Failed to load config {}: {}", args[2], e);
                return;
            }
        }
    } else {
        create_example_settings()
    };

    settings.log.init_logger();

    match dotenv {
        Ok(path) => info!("Loaded environment from: {}", path.display()),
        Err(_) => info!("No .env file found, using system environment variables"),
    }
    if args.len() <= 2 {
        info!("No config file provided, using example configuration");
    }

    let credentials = match Credentials::from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            error!("{}", e);
            error!("Create a .env file with APEX_API_KEY, APEX_API_SECRET and APEX_API_PASSPHRASE");
            return;
        }
    };

    // Handlers go in before any order exists so an early signal still stops the grid
    let mut shutdown_rx = match spawn_shutdown_listener() {
        Ok(rx) => rx,
        Err(e) => {
            error!("Failed to install signal handlers: {}", e);
            return;
        }
    };

    let grid = &settings.grid;
    info!("Starting grid bot for {}", grid.symbol);
    info!("Levels: {} each side", grid.levels);
    info!("Spacing: {}%", grid.spacing_percent);
    info!("Order size: {}", grid.order_size);
    info!("Poll interval: {}s", settings.runner.poll_interval().as_secs());

    if settings.network.is_mainnet() {
        warn!("Using MAINNET - real funds at risk!");
    } else {
        info!("Using {}", settings.network.env.to_uppercase());
    }

    let client = match settings.network.client(Some(credentials)) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to create client: {}", e);
            return;
        }
    };

    let account = Account::new(client.clone());
    match account.get_balance().await {
        Ok(balance) => info!(
            "Starting balance: equity {:.2}, available {:.2}",
            balance.total_equity, balance.available
        ),
        Err(e) if e.is_auth_failure() => {
            error!("Authentication failed, check your API credentials: {}", e);
            return;
        }
        Err(e) => warn!("Could not fetch balance: {}", e),
    }

    let exchange = Arc::new(ApexExchange::new(client.clone()));
    let mut runner = match GridRunner::new(settings.grid.clone(), exchange, settings.runner.clone()) {
        Ok(runner) => runner,
        Err(e) => {
            error!("Invalid grid configuration: {}", e);
            return;
        }
    };

    if shutdown_rx.try_recv().is_ok() {
        info!("Shutdown requested before the grid was placed");
        return;
    }
    let shutdown = async move {
        let _ = shutdown_rx.await;
    };

    info!("Grid bot is now RUNNING, press Ctrl-C to stop");
    match runner.run_until(shutdown).await {
        Ok(summary) => info!(
            "Stopped after {} cycles: {} fills, {} replacements, {} orders cancelled",
            summary.cycles, summary.fills, summary.replacements, summary.cancelled_on_stop
        ),
        Err(e) => error!("Grid bot stopped with error: {}", e),
    }

    match account.get_balance().await {
        Ok(balance) => {
            println!("Final balance:");
            println!("  Total equity: {:.2}", balance.total_equity);
            println!("  Available:    {:.2}", balance.available);
            if let Some(pnl) = balance.unrealized_pnl {
                println!("  Unrealized:   {:.2}", pnl);
            }
        }
        Err(e) => error!("Failed to fetch final balance: {}", e),
    }
}

/// Resolve the returned receiver on the first SIGINT or SIGTERM
#[cfg(unix)]
fn spawn_shutdown_listener() -> std::io::Result<oneshot::Receiver<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => info!("Received Ctrl-C, shutting down"),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
        }
        let _ = tx.send(());
    });
    Ok(rx)
}

#[cfg(not(unix))]
fn spawn_shutdown_listener() -> std::io::Result<oneshot::Receiver<()>> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, shutting down");
                let _ = tx.send(());
            }
            Err(e) => {
                error!("Failed to listen for Ctrl-C: {}", e);
                // keep the sender alive so the bot is not stopped by the failure
                std::future::pending::<()>().await;
                drop(tx);
            }
        }
    });
    Ok(rx)
}

fn create_example_settings() -> Settings {
    Settings {
        network: NetworkConfig {
            env: "testnet".to_string(),
            base_url: None,
            timeout_secs: 30,
        },
        grid: GridConfig::new("BTC-USDT", 3, 0.5, 0.0001),
        runner: RunnerConfig::default(),
        log: LogConfig::default(),
    }
}
