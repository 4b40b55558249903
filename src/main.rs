mod app;
mod config;
mod domain;
mod infrastructure;
mod state;
mod tasks;
mod telegram;
mod transport;

use anyhow::Result;
use infrastructure::{directories, logging, shutdown};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config, &paths)?;

    let shutdown = shutdown::Shutdown::new();
    shutdown::install_signal_handlers(shutdown.clone());

    let app = app::StickyKeeperApp::initialize(config, paths, shutdown).await?;
    app.run().await
}
