// Main entry point - Dependency injection and refresh run
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::application::refresh_service::RefreshService;
use crate::application::task_runner::{FixedInterval, PollWait};
use crate::infrastructure::config::{load_looker_config, load_refresh_config};
use crate::infrastructure::looker_client::LookerClient;
use crate::presentation::report::format_summary;

const DASHBOARD_ID: &str = "163";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let looker_config = load_looker_config()?;
    let refresh_config = load_refresh_config()?;
    let dashboard_id = refresh_config
        .dashboard_id
        .unwrap_or_else(|| DASHBOARD_ID.to_string());

    // Create API client (infrastructure layer)
    let api = Arc::new(LookerClient::new(&looker_config)?);
    let wait = Arc::new(FixedInterval::new(Duration::from_secs(
        refresh_config.poll_interval_secs,
    )));

    // Run the refresh (application layer)
    tracing::info!(
        "Refreshing dashboard {} on {} (poll every {:?})",
        dashboard_id,
        looker_config.base_url,
        wait.interval()
    );
    let service = RefreshService::new(api, wait);
    let summary = service.refresh(&dashboard_id).await?;

    tracing::info!("{}", format_summary(&summary));

    Ok(())
}
