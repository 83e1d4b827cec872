use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    batch::{BatchAggregator, FlushResult},
    clients::{mailer::Mailer, store::NotificationStore},
    models::{
        notification::{DeliveryRoute, Notification, NotificationType, StoredNotification},
        outcome::{DispatchError, DispatchOutcome},
    },
};

/// Handling path for one classified notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPath {
    InstantEmail,
    BatchedEmail,
    SystemStore,
}

/// Selects the handling path from the two envelope enumerations. The
/// notification type is never consulted on the system route; everything the
/// table does not name is unroutable.
pub fn classify(
    route: &DeliveryRoute,
    kind: &NotificationType,
) -> Result<DispatchPath, DispatchError> {
    match (route, kind) {
        (DeliveryRoute::Email, NotificationType::Instant) => Ok(DispatchPath::InstantEmail),
        (DeliveryRoute::Email, NotificationType::Batch) => Ok(DispatchPath::BatchedEmail),
        (DeliveryRoute::System, _) => Ok(DispatchPath::SystemStore),
        _ => Err(DispatchError::UnroutableNotification {
            route: route.clone(),
            kind: kind.clone(),
        }),
    }
}

/// Orchestrates one dispatch call: classify, decode, then hand the
/// notification to the email transport, the batch aggregator, or the store.
/// Collaborator failures surface once as classified errors; nothing here
/// retries.
pub struct Dispatcher {
    mailer: Arc<dyn Mailer>,
    store: Arc<dyn NotificationStore>,
    batches: BatchAggregator,
}

impl Dispatcher {
    pub fn new(
        batch_amount: usize,
        mailer: Arc<dyn Mailer>,
        store: Arc<dyn NotificationStore>,
    ) -> Self {
        Self {
            mailer,
            store,
            batches: BatchAggregator::new(batch_amount),
        }
    }

    pub async fn dispatch(
        &self,
        notification: Notification,
    ) -> Result<DispatchOutcome, DispatchError> {
        let path = classify(
            &notification.delivery_route,
            &notification.notification_type,
        )?;

        debug!(
            event = %notification.event_name,
            route = %notification.delivery_route,
            kind = %notification.notification_type,
            "Dispatching notification"
        );

        match path {
            DispatchPath::InstantEmail => {
                let email = notification.email_metadata()?;

                self.mailer
                    .send_email(&email.email_address, &email.email_body)
                    .await
                    .map_err(DispatchError::DeliveryFailed)?;

                info!(event = %notification.event_name, "Instant email delivered");

                Ok(DispatchOutcome::Delivered)
            }
            DispatchPath::BatchedEmail => {
                let email = notification.email_metadata()?;

                match self.batches.offer(&notification.event_name, email).await {
                    FlushResult::Accumulated { pending } => {
                        Ok(DispatchOutcome::Accumulated { pending })
                    }
                    FlushResult::Flushed { address, body } => {
                        // The queue is already cleared; a failed send here
                        // loses the flushed batch.
                        self.mailer.send_email(&address, &body).await.map_err(|e| {
                            warn!(
                                event = %notification.event_name,
                                "Flushed batch send failed, batch is lost"
                            );
                            DispatchError::DeliveryFailed(e)
                        })?;

                        info!(event = %notification.event_name, "Batched email delivered");

                        Ok(DispatchOutcome::Delivered)
                    }
                }
            }
            DispatchPath::SystemStore => {
                let metadata = notification.system_metadata()?;
                let record = StoredNotification::from_envelope(&notification, metadata);
                let id = record.id;

                self.store
                    .insert(record)
                    .await
                    .map_err(DispatchError::PersistenceFailed)?;

                info!(event = %notification.event_name, id = %id, "System notification persisted");

                Ok(DispatchOutcome::Persisted)
            }
        }
    }
}
