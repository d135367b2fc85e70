mod app;
mod cli;
mod config;
mod grid;
mod http;
mod legacy;
mod paths;
mod season_map;
mod store;
#[cfg(test)]
mod test_support;
mod tvmaze;
mod watch_map;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

const LOG_ENV: &str = "TVTRACK_LOG";

fn main() -> Result<()> {
    init_tracing();
    let cli = cli::Cli::parse();
    let settings = Settings::resolve(cli.data.as_deref())?;
    app::run(cli, &settings)
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("tvtrack=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
