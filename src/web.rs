#![cfg(not(tarpaulin_include))]

use env_logger::Env;
use genviz::app;
use genviz::config::ServerConfig;
use log::info;

/// Main entry point for the dashboard server
///
/// # Arguments
/// * `[host] [port]` - Optional positional arguments; `GENVIZ_HOST` and
///   `GENVIZ_PORT` are used when they are absent
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = ServerConfig::from_env();
    info!("Starting dashboard server on {}", config.address());

    app::run(config).await
}
