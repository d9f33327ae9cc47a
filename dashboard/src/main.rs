use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use clap::Parser;
use dashboard::io::ReqwestHttpClient;
use dashboard::model::Node;
use dashboard::risk::classify_opt;
use dashboard::{metrics, new_state_handle, tui, Config, DetailFetcher, NodeClient, Poller, StateHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    config.validate()?;

    init_logging(&config)?;

    info!("Starting fire-risk dashboard");
    info!("API: {}", config.api_url);
    info!(
        "Poll interval: {:?}, request timeout: {:?}",
        config.poll_interval(),
        config.request_timeout()
    );

    metrics::init_metrics();

    let http = ReqwestHttpClient::new(config.request_timeout())?;
    let client = Arc::new(NodeClient::new(&config.api_url, Arc::new(http))?);
    let state = new_state_handle();
    let cancel = CancellationToken::new();

    let poller = Poller::new(
        Arc::clone(&client),
        Arc::clone(&state),
        config.poll_interval(),
        cancel.clone(),
    );
    let poller_handle = tokio::spawn(async move {
        poller.run().await;
    });

    if config.headless {
        let summary_handle = tokio::spawn(log_summaries(
            Arc::clone(&state),
            config.poll_interval(),
            cancel.clone(),
        ));

        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Received shutdown signal");
        cancel.cancel();
        if let Err(e) = summary_handle.await {
            error!("Summary task failed: {}", e);
        }
    } else {
        let fetcher = DetailFetcher::new(client, Arc::clone(&state));
        if let Err(e) = tui::run(state, fetcher, cancel.clone()).await {
            error!("Terminal UI failed: {}", e);
        }
        cancel.cancel();
    }

    if let Err(e) = poller_handle.await {
        error!("Poller task failed: {}", e);
    }

    if config.print_metrics {
        print!("{}", metrics::gather_metrics());
    }

    info!("Shutting down");
    Ok(())
}

fn init_logging(config: &Config) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if config.headless {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        // The terminal UI owns stdout
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

/// Log one line per node whenever the node list changes
async fn log_summaries(state: StateHandle, every: std::time::Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(every);
    let mut last_logged: Option<Vec<Node>> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel.cancelled() => break,
        }

        let state = state.read().await;
        if state.last_update.is_none() || last_logged.as_ref() == Some(&state.nodes) {
            continue;
        }
        last_logged = Some(state.nodes.clone());

        for node in &state.nodes {
            let class = classify_opt(node.risk_level());
            info!(
                "{} ({:.4}, {:.4}): {}{}",
                node.node_name,
                node.latitude,
                node.longitude,
                class.label,
                if node.on_fire() { ", FIRE" } else { "" }
            );
        }
    }
}
