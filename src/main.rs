use std::sync::Arc;

use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

mod api;
mod commands;
mod config;
mod models;
mod server;
mod services;
mod utils;

use api::provider::ProviderClient;
use config::Config;
use services::proxy_service::SignedProxy;

const DEFAULT_LOG_FILTER: &str = "wallet_history_proxy=debug,warp=info,hyper=warn,reqwest=warn";

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match commands::parse_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    if !command.needs_provider() {
        if let Err(e) = commands::help::execute() {
            eprintln!("{}", e);
        }
        return;
    }

    info!("Starting wallet-history-proxy v{}", env!("CARGO_PKG_VERSION"));

    let config = match Config::from_env() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    debug!("Provider base URL: {}", config.provider.base_url);

    let client = match ProviderClient::new(&config.provider) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create provider client: {}", e);
            std::process::exit(1);
        }
    };
    let proxy = SignedProxy::new(client, config.server.search_echo_page);

    if let Err(e) = commands::run(command, config, proxy).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
