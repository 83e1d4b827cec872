use std::{sync::Arc, time::Duration};

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{Config, EmailTransport};

/// Outbound email transport. One implementation is selected by configuration
/// at startup and injected into the dispatch core, which never retries a
/// failed send.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, address: &str, body: &str) -> Result<(), Error>;

    /// Connectivity probe for the health endpoint.
    async fn probe(&self) -> Result<(), Error>;
}

pub fn from_config(config: &Config) -> Result<Arc<dyn Mailer>, Error> {
    match config.email_transport {
        EmailTransport::Relay => {
            let base_url = config
                .mail_relay_url
                .clone()
                .ok_or_else(|| anyhow!("MAIL_RELAY_URL is required for the relay transport"))?;

            Ok(Arc::new(HttpRelayMailer::new(base_url)?))
        }
        EmailTransport::Log => Ok(Arc::new(LogMailer)),
    }
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    to: &'a str,
    body: &'a str,
}

/// Sends mail through an HTTP relay service.
pub struct HttpRelayMailer {
    http_client: Client,
    base_url: String,
}

impl HttpRelayMailer {
    pub fn new(base_url: String) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|_| anyhow!("Failed to create HTTP client"))?;

        info!(base_url = %base_url, "HTTP relay mailer initialized");

        Ok(Self {
            http_client,
            base_url,
        })
    }
}

#[async_trait]
impl Mailer for HttpRelayMailer {
    async fn send_email(&self, address: &str, body: &str) -> Result<(), Error> {
        let url = format!("{}/messages", self.base_url);

        debug!(address, "Sending email through relay");

        let response = self
            .http_client
            .post(&url)
            .json(&RelayMessage { to: address, body })
            .send()
            .await?;

        if response.status().is_success() {
            info!(address, "Email accepted by relay");
            Ok(())
        } else {
            let status = response.status();
            let error_text = response.text().await?;
            Err(anyhow!("Mail relay returned status {}: {}", status, error_text))
        }
    }

    async fn probe(&self) -> Result<(), Error> {
        let url = format!("{}/health", self.base_url);

        let response = self.http_client.get(&url).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(anyhow!(
                "Mail relay health probe returned status {}",
                response.status()
            ))
        }
    }
}

/// Development sink that logs sends instead of delivering them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_email(&self, address: &str, body: &str) -> Result<(), Error> {
        info!(address, body_len = body.len(), "Log mailer discarding email");
        Ok(())
    }

    async fn probe(&self) -> Result<(), Error> {
        Ok(())
    }
}
