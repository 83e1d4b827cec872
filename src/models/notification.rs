use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::outcome::DispatchError;

/// Top-level channel selector. Unrecognized wire values are preserved so the
/// router can report them instead of failing at the JSON layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryRoute {
    Email,
    System,
    #[serde(untagged)]
    Other(String),
}

/// Timing selector for the email route. Never consulted on the system route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Instant,
    Batch,
    #[serde(untagged)]
    Other(String),
}

impl Display for DeliveryRoute {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryRoute::Email => write!(f, "email"),
            DeliveryRoute::System => write!(f, "system"),
            DeliveryRoute::Other(value) => write!(f, "{}", value),
        }
    }
}

impl Display for NotificationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            NotificationType::Instant => write!(f, "instant"),
            NotificationType::Batch => write!(f, "batch"),
            NotificationType::Other(value) => write!(f, "{}", value),
        }
    }
}

/// Inbound envelope. The `metadata` shape depends on the delivery route and
/// is decoded on demand by the route-specific accessors below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub date: String,
    pub event_name: String,
    pub delivery_route: DeliveryRoute,
    pub notification_type: NotificationType,
    pub metadata: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMetadata {
    pub email_address: String,
    pub email_body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetadata {
    pub uuid: Uuid,
    pub body: String,
}

impl Notification {
    /// Decodes the envelope metadata as the email-route schema.
    pub fn email_metadata(&self) -> Result<EmailMetadata, DispatchError> {
        serde_json::from_value(self.metadata.clone()).map_err(|source| {
            DispatchError::InvalidMetadata {
                route: self.delivery_route.clone(),
                source,
            }
        })
    }

    /// Decodes the envelope metadata as the system-route schema.
    pub fn system_metadata(&self) -> Result<SystemMetadata, DispatchError> {
        serde_json::from_value(self.metadata.clone()).map_err(|source| {
            DispatchError::InvalidMetadata {
                route: self.delivery_route.clone(),
                source,
            }
        })
    }
}

/// Record kept by the notification store for the system route. Keyed by the
/// uuid the sender supplied so later remove/mark-as-read calls can address it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredNotification {
    pub id: Uuid,
    pub event_name: String,
    pub date: String,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl StoredNotification {
    pub fn from_envelope(notification: &Notification, metadata: SystemMetadata) -> Self {
        Self {
            id: metadata.uuid,
            event_name: notification.event_name.clone(),
            date: notification.date.clone(),
            body: metadata.body,
            read: false,
            created_at: Utc::now(),
        }
    }
}
