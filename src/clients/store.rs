use std::sync::Arc;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_postgres::NoTls;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    config::{Config, StoreBackend},
    models::notification::StoredNotification,
};

/// Durable surface for system-route notifications. `insert` is the only
/// operation the dispatch core consumes; the rest are pass-through surfaces
/// for the HTTP layer.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, record: StoredNotification) -> Result<(), Error>;
    async fn get_all(&self) -> Result<Vec<StoredNotification>, Error>;
    async fn remove(&self, id: Uuid) -> Result<(), Error>;
    async fn mark_as_read(&self, id: Uuid) -> Result<(), Error>;
    async fn health_check(&self) -> Result<(), Error>;
}

pub async fn from_config(config: &Config) -> Result<Arc<dyn NotificationStore>, Error> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow!("DATABASE_URL is required for the postgres backend"))?;

            Ok(Arc::new(PgStore::connect(database_url).await?))
        }
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

pub struct PgStore {
    client: tokio_postgres::Client,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        info!("Connecting to PostgreSQL database");

        let (client, connection) = tokio_postgres::connect(database_url, NoTls)
            .await
            .map_err(|e| anyhow!("Failed to connect to database: {}", e))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection terminated");
            }
        });

        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS system_notifications (
                    id UUID PRIMARY KEY,
                    event_name TEXT NOT NULL,
                    event_date TEXT NOT NULL,
                    body TEXT NOT NULL,
                    read BOOLEAN NOT NULL DEFAULT FALSE,
                    created_at TIMESTAMPTZ NOT NULL
                )",
            )
            .await
            .map_err(|e| anyhow!("Failed to prepare notifications table: {}", e))?;

        info!("PostgreSQL connection established");

        Ok(Self { client })
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert(&self, record: StoredNotification) -> Result<(), Error> {
        self.client
            .execute(
                "INSERT INTO system_notifications
                    (id, event_name, event_date, body, read, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6)",
                &[
                    &record.id,
                    &record.event_name,
                    &record.date,
                    &record.body,
                    &record.read,
                    &record.created_at,
                ],
            )
            .await
            .map_err(|e| {
                error!(error = %e, id = %record.id, "Failed to insert notification");
                anyhow!("Database write failed: {}", e)
            })?;

        debug!(id = %record.id, event = %record.event_name, "System notification stored");

        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<StoredNotification>, Error> {
        let rows = self
            .client
            .query(
                "SELECT id, event_name, event_date, body, read, created_at
                 FROM system_notifications
                 ORDER BY created_at",
                &[],
            )
            .await
            .map_err(|e| anyhow!("Database read failed: {}", e))?;

        Ok(rows
            .iter()
            .map(|row| StoredNotification {
                id: row.get(0),
                event_name: row.get(1),
                date: row.get(2),
                body: row.get(3),
                read: row.get(4),
                created_at: row.get(5),
            })
            .collect())
    }

    async fn remove(&self, id: Uuid) -> Result<(), Error> {
        let affected = self
            .client
            .execute("DELETE FROM system_notifications WHERE id = $1", &[&id])
            .await
            .map_err(|e| anyhow!("Database delete failed: {}", e))?;

        if affected == 0 {
            return Err(anyhow!("No notification with id {}", id));
        }

        Ok(())
    }

    async fn mark_as_read(&self, id: Uuid) -> Result<(), Error> {
        let affected = self
            .client
            .execute(
                "UPDATE system_notifications SET read = TRUE WHERE id = $1",
                &[&id],
            )
            .await
            .map_err(|e| anyhow!("Database update failed: {}", e))?;

        if affected == 0 {
            return Err(anyhow!("No notification with id {}", id));
        }

        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        self.client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| anyhow!("Database health check failed: {}", e))?;

        Ok(())
    }
}

/// In-memory store used for development and tests. Insertion order is
/// preserved, matching the postgres backend's created_at ordering.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<StoredNotification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert(&self, record: StoredNotification) -> Result<(), Error> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<StoredNotification>, Error> {
        Ok(self.records.read().await.clone())
    }

    async fn remove(&self, id: Uuid) -> Result<(), Error> {
        let mut records = self.records.write().await;
        let before = records.len();

        records.retain(|record| record.id != id);

        if records.len() == before {
            return Err(anyhow!("No notification with id {}", id));
        }

        Ok(())
    }

    async fn mark_as_read(&self, id: Uuid) -> Result<(), Error> {
        let mut records = self.records.write().await;

        match records.iter_mut().find(|record| record.id == id) {
            Some(record) => {
                record.read = true;
                Ok(())
            }
            None => Err(anyhow!("No notification with id {}", id)),
        }
    }

    async fn health_check(&self) -> Result<(), Error> {
        Ok(())
    }
}
