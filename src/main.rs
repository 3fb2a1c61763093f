use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use pollgate::channels::{delivery_loop, SlackChannel, SlackNotifier, SlackVerifier, DEFAULT_QUEUE_CAPACITY};
use pollgate::cli::{self, Cli, Command, ConfigCommand};
use pollgate::config::{self, Config};
use pollgate::logging;
use pollgate::polls::{create_store, LoggingListener};
use pollgate::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        None | Some(Command::Start) => run_server(config_path).await,
        Some(Command::Config(ConfigCommand::Show)) => cli::handle_config_show(config_path),
        Some(Command::Config(ConfigCommand::Get { key })) => {
            cli::handle_config_get(config_path, &key)
        }
        Some(Command::Config(ConfigCommand::Path)) => {
            cli::handle_config_path(config_path);
            Ok(())
        }
        Some(Command::Status { host, port }) => cli::handle_status(config_path, &host, port).await,
        Some(Command::Version) => {
            cli::handle_version();
            Ok(())
        }
    }
}

async fn run_server(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let cfg: Config = config::load_config(config_path)?;
    logging::init_logging(&cfg.logging)?;

    let store = create_store();
    store.subscribe(Arc::new(LoggingListener));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut delivery = None;

    if cfg.slack.enabled {
        let slack = SlackChannel::new(cfg.slack.clone())?;
        if let Err(e) = slack.connect().await {
            warn!(error = %e, "Slack auth check failed; deliveries will keep retrying");
        }

        let (notifier, rx) = SlackNotifier::new(DEFAULT_QUEUE_CAPACITY);
        store.subscribe(Arc::new(notifier));
        delivery = Some(tokio::spawn(delivery_loop(
            slack,
            rx,
            cfg.slack.max_retries,
            shutdown_rx,
        )));
        info!(channel = %cfg.slack.default_channel, "Slack delivery enabled");
    } else {
        info!("Slack delivery disabled");
    }

    if cfg.slack.signing_secret.is_empty() {
        warn!("No Slack signing secret configured; callbacks are not verified");
    }

    let state = AppState::new(store, SlackVerifier::new(cfg.slack.signing_secret.clone()));
    server::serve(&cfg.server, state, shutdown_signal()).await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = delivery {
        if let Err(e) = handle.await {
            error!(error = %e, "delivery task failed");
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
