mod api;
mod browser;
mod config;
mod controller;
mod models;
mod mpv;
mod ui;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let log_path = config::log_path()?;
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Open log file: {log_path:?}"))?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,hyper_util=warn,reqwest=warn")),
        )
        .with_ansi(false)
        .with_target(false)
        .init();

    tracing::info!("radiodial starting");

    let handle = controller::start_controller();
    ui::run(handle)
}
