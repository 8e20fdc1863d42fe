use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use miner_console::miners::api::HttpFetcher;
use miner_console::render::report::{self, ReportView};
use miner_console::{ConsoleConfig, Scheduler, SnapshotMap};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "console.json".to_string());
    let config = Arc::new(ConsoleConfig::load_or_default(&config_path));
    info!(devices = config.devices.len(), "starting miner console");

    render_security_report(&config).await;

    let fetcher = Arc::new(HttpFetcher::new(config.fetch_timeout()));
    let snapshots: SnapshotMap = Arc::new(RwLock::new(HashMap::new()));
    let scheduler = Scheduler::new(config.clone(), fetcher, snapshots);
    let handle = scheduler.start();

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "failed to wait for shutdown signal");
    }
    info!("shutting down");
    scheduler.stop();
    let _ = handle.await;
}

/// Loads, filters and renders the security report once at startup. Hidden
/// means clean: the output contains no report container at all.
async fn render_security_report(config: &ConsoleConfig) {
    let html = match report::load_report_text(&config.report.candidate_paths).await {
        Ok(text) => match report::render_report(&text, &config.report.ignored_patterns) {
            ReportView::Hidden => {
                info!("security report clean, hiding");
                String::new()
            }
            ReportView::Rendered(rendered) => {
                info!(warnings = rendered.warning_count, "security report rendered");
                rendered.html
            }
        },
        Err(err) => {
            warn!(%err, "security report unavailable");
            report::render_error_panel(&err.to_string())
        }
    };

    if let Err(err) = tokio::fs::write(&config.report.output_path, html).await {
        warn!(%err, path = %config.report.output_path.display(), "failed to write report view");
    }
}
