use anyhow::{Error, Result, anyhow, bail};
use dotenvy::dotenv;
use serde::Deserialize;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmailTransport {
    Relay,
    Log,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    pub batch_amount: usize,

    pub email_transport: EmailTransport,
    pub mail_relay_url: Option<String>,

    pub store_backend: StoreBackend,
    pub database_url: Option<String>,

    pub server_port: u16,
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|_| anyhow!("Invalid or missing environmental variable"))?;

        config.validate()?;

        Ok(config)
    }

    /// A zero threshold would never flush; it is rejected before the
    /// aggregator is ever built.
    pub fn validate(&self) -> Result<(), Error> {
        if self.batch_amount == 0 {
            bail!("BATCH_AMOUNT must be at least 1");
        }

        if self.email_transport == EmailTransport::Relay && self.mail_relay_url.is_none() {
            bail!("MAIL_RELAY_URL is required when EMAIL_TRANSPORT is 'relay'");
        }

        if self.store_backend == StoreBackend::Postgres && self.database_url.is_none() {
            bail!("DATABASE_URL is required when STORE_BACKEND is 'postgres'");
        }

        Ok(())
    }
}
