mod bills;
mod client;
mod config;
mod model;
mod readings;
mod render;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use log::{error, info};
use std::time::Duration;

use crate::config::OutputFormat;
use crate::render::{Dashboard, ViewOptions};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = config::Config::parse();
    info!("Starting energydash");

    let range = config.range()?;
    let token = config::load_api_token()?;
    let api = client::SnapmeterClient::new(
        &config.base_url,
        &config.meter_id,
        &config.service_id,
        &token,
        Duration::from_secs(config.timeout_secs),
    )?;

    // One failed endpoint invalidates the whole load; nothing partial is shown.
    let snapshot = match client::load_snapshot(&api, &range).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("Failed to load dashboard data: {}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let options = ViewOptions::from(&config);
    let dashboard = match config.timezone {
        Some(tz) => Dashboard::build(&snapshot, &options, &tz),
        None => Dashboard::build(&snapshot, &options, &Local),
    };

    let output = match config.format {
        OutputFormat::Text => dashboard
            .render_text()
            .context("Failed to render dashboard as text")?,
        OutputFormat::Json => dashboard
            .render_json()
            .context("Failed to serialize dashboard to JSON")?,
    };
    println!("{}", output);

    Ok(())
}
