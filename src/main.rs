use anyhow::{Error, Result, anyhow};
use tracing_subscriber::EnvFilter;

use notify_dispatch::{
    api,
    clients::{mailer, store},
    config::Config,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let mailer = mailer::from_config(&config)?;
    let store = store::from_config(&config).await?;

    api::run_api_server(config, mailer, store)
        .await
        .map_err(|e| anyhow!("API server failed: {}", e))
}
