use serde::Serialize;
use thiserror::Error;

use crate::models::notification::{DeliveryRoute, NotificationType};

/// Uniform result of one dispatch call. Every accepted notification resolves
/// to exactly one of these, synchronously.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum DispatchOutcome {
    /// An email left through the transport (instant send or batch flush).
    Delivered,
    /// A batched email joined its event queue without reaching the threshold.
    Accumulated { pending: usize },
    /// A system notification was written to the store.
    Persisted,
}

/// Classified dispatch failures. All four are terminal; the core never
/// retries on its own.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid metadata for {route} route: {source}")]
    InvalidMetadata {
        route: DeliveryRoute,
        #[source]
        source: serde_json::Error,
    },

    #[error("no dispatch path for delivery route '{route}' and notification type '{kind}'")]
    UnroutableNotification {
        route: DeliveryRoute,
        kind: NotificationType,
    },

    #[error("email delivery failed: {0}")]
    DeliveryFailed(#[source] anyhow::Error),

    #[error("notification store rejected the record: {0}")]
    PersistenceFailed(#[source] anyhow::Error),
}
