use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use notify_dispatch::{
    clients::{
        mailer::Mailer,
        store::{MemoryStore, NotificationStore},
    },
    dispatch::{DispatchPath, Dispatcher, classify},
    models::{
        notification::{DeliveryRoute, Notification, NotificationType, StoredNotification},
        outcome::{DispatchError, DispatchOutcome},
    },
};
use tokio::sync::Mutex;
use uuid::Uuid;

struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
    fail_next: AtomicBool,
}

impl RecordingMailer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
        })
    }

    async fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_email(&self, address: &str, body: &str) -> Result<(), Error> {
        if self.fail_next.load(Ordering::SeqCst) {
            return Err(anyhow!("Simulated transport outage"));
        }

        self.sent
            .lock()
            .await
            .push((address.to_string(), body.to_string()));

        Ok(())
    }

    async fn probe(&self) -> Result<(), Error> {
        Ok(())
    }
}

struct FailingStore;

#[async_trait]
impl NotificationStore for FailingStore {
    async fn insert(&self, _record: StoredNotification) -> Result<(), Error> {
        Err(anyhow!("Simulated store outage"))
    }

    async fn get_all(&self) -> Result<Vec<StoredNotification>, Error> {
        Err(anyhow!("Simulated store outage"))
    }

    async fn remove(&self, _id: Uuid) -> Result<(), Error> {
        Err(anyhow!("Simulated store outage"))
    }

    async fn mark_as_read(&self, _id: Uuid) -> Result<(), Error> {
        Err(anyhow!("Simulated store outage"))
    }

    async fn health_check(&self) -> Result<(), Error> {
        Err(anyhow!("Simulated store outage"))
    }
}

/// Builds an envelope through the wire schema so the open enums and
/// camelCase field names are exercised.
fn notification(event: &str, route: &str, kind: &str, metadata: serde_json::Value) -> Notification {
    serde_json::from_value(serde_json::json!({
        "date": "2026-08-07T10:00:00Z",
        "eventName": event,
        "deliveryRoute": route,
        "notificationType": kind,
        "metadata": metadata,
    }))
    .expect("notification envelope should deserialize")
}

fn email_metadata(address: &str, body: &str) -> serde_json::Value {
    serde_json::json!({ "emailAddress": address, "emailBody": body })
}

fn dispatcher(batch_amount: usize, mailer: Arc<RecordingMailer>) -> Dispatcher {
    Dispatcher::new(batch_amount, mailer, Arc::new(MemoryStore::new()))
}

/// Test: The router covers the full classification table
#[test]
fn test_classify_paths() {
    assert_eq!(
        classify(&DeliveryRoute::Email, &NotificationType::Instant).unwrap(),
        DispatchPath::InstantEmail
    );
    assert_eq!(
        classify(&DeliveryRoute::Email, &NotificationType::Batch).unwrap(),
        DispatchPath::BatchedEmail
    );
    assert_eq!(
        classify(&DeliveryRoute::System, &NotificationType::Instant).unwrap(),
        DispatchPath::SystemStore
    );
    assert_eq!(
        classify(&DeliveryRoute::System, &NotificationType::Batch).unwrap(),
        DispatchPath::SystemStore
    );

    let unroutable = classify(
        &DeliveryRoute::Other("sms".to_string()),
        &NotificationType::Instant,
    );
    assert!(matches!(
        unroutable,
        Err(DispatchError::UnroutableNotification { .. })
    ));
}

/// Test: A valid instant email invokes the mailer exactly once
#[tokio::test]
async fn test_instant_email_invokes_mailer_once() {
    let mailer = RecordingMailer::new();
    let dispatcher = dispatcher(2, Arc::clone(&mailer));

    let outcome = dispatcher
        .dispatch(notification(
            "welcome",
            "email",
            "instant",
            email_metadata("user@x.com", "hello"),
        ))
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::Delivered);
    assert_eq!(
        mailer.sent_messages().await,
        vec![("user@x.com".to_string(), "hello".to_string())]
    );
}

/// Test: An instant email surfaces a mailer error as DeliveryFailed
#[tokio::test]
async fn test_instant_email_delivery_failure() {
    let mailer = RecordingMailer::new();
    mailer.fail_next.store(true, Ordering::SeqCst);

    let dispatcher = dispatcher(2, Arc::clone(&mailer));

    let result = dispatcher
        .dispatch(notification(
            "welcome",
            "email",
            "instant",
            email_metadata("user@x.com", "hello"),
        ))
        .await;

    assert!(matches!(result, Err(DispatchError::DeliveryFailed(_))));
}

/// Test: The batch flush sends the joined bodies to the first member's
/// address, then accumulation restarts from one
#[tokio::test]
async fn test_batch_flush_uses_first_address_and_joined_bodies() {
    let mailer = RecordingMailer::new();
    let dispatcher = dispatcher(2, Arc::clone(&mailer));

    let first = dispatcher
        .dispatch(notification(
            "promo",
            "email",
            "batch",
            email_metadata("a@x.com", "hi"),
        ))
        .await
        .unwrap();

    assert_eq!(first, DispatchOutcome::Accumulated { pending: 1 });
    assert!(mailer.sent_messages().await.is_empty());

    let second = dispatcher
        .dispatch(notification(
            "promo",
            "email",
            "batch",
            email_metadata("b@x.com", "bye"),
        ))
        .await
        .unwrap();

    assert_eq!(second, DispatchOutcome::Delivered);
    assert_eq!(
        mailer.sent_messages().await,
        vec![("a@x.com".to_string(), "hi\nbye\n".to_string())]
    );

    let third = dispatcher
        .dispatch(notification(
            "promo",
            "email",
            "batch",
            email_metadata("c@x.com", "again"),
        ))
        .await
        .unwrap();

    assert_eq!(third, DispatchOutcome::Accumulated { pending: 1 });
}

/// Test: A failed flush send does not restore the cleared queue. The batch
/// is lost; this pins the documented data-loss behavior.
#[tokio::test]
async fn test_failed_flush_send_does_not_restore_queue() {
    let mailer = RecordingMailer::new();
    let dispatcher = dispatcher(2, Arc::clone(&mailer));

    dispatcher
        .dispatch(notification(
            "promo",
            "email",
            "batch",
            email_metadata("a@x.com", "hi"),
        ))
        .await
        .unwrap();

    mailer.fail_next.store(true, Ordering::SeqCst);

    let result = dispatcher
        .dispatch(notification(
            "promo",
            "email",
            "batch",
            email_metadata("b@x.com", "bye"),
        ))
        .await;

    assert!(matches!(result, Err(DispatchError::DeliveryFailed(_))));

    mailer.fail_next.store(false, Ordering::SeqCst);

    let outcome = dispatcher
        .dispatch(notification(
            "promo",
            "email",
            "batch",
            email_metadata("c@x.com", "fresh"),
        ))
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::Accumulated { pending: 1 });
}

/// Test: A system notification is persisted unread under its metadata uuid
#[tokio::test]
async fn test_system_notification_is_persisted() {
    let store: Arc<dyn NotificationStore> = Arc::new(MemoryStore::new());
    let dispatcher = Dispatcher::new(2, RecordingMailer::new(), Arc::clone(&store));
    let id = Uuid::new_v4();

    let outcome = dispatcher
        .dispatch(notification(
            "maintenance",
            "system",
            "instant",
            serde_json::json!({ "uuid": id, "body": "downtime at noon" }),
        ))
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::Persisted);

    let stored = store.get_all().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, id);
    assert_eq!(stored[0].body, "downtime at noon");
    assert_eq!(stored[0].event_name, "maintenance");
    assert!(!stored[0].read);
}

/// Test: The system route ignores the notification type entirely
#[tokio::test]
async fn test_system_route_ignores_notification_type() {
    let store: Arc<dyn NotificationStore> = Arc::new(MemoryStore::new());
    let dispatcher = Dispatcher::new(2, RecordingMailer::new(), Arc::clone(&store));

    for kind in ["instant", "batch", "digest"] {
        let outcome = dispatcher
            .dispatch(notification(
                "maintenance",
                "system",
                kind,
                serde_json::json!({ "uuid": Uuid::new_v4(), "body": "note" }),
            ))
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Persisted);
    }

    assert_eq!(store.get_all().await.unwrap().len(), 3);
}

/// Test: Email-shaped metadata under the system route is invalid
#[tokio::test]
async fn test_email_metadata_under_system_route_is_invalid() {
    let dispatcher = dispatcher(2, RecordingMailer::new());

    let result = dispatcher
        .dispatch(notification(
            "maintenance",
            "system",
            "instant",
            email_metadata("user@x.com", "hello"),
        ))
        .await;

    assert!(matches!(result, Err(DispatchError::InvalidMetadata { .. })));
}

/// Test: Metadata missing a required field is invalid and never reaches the
/// mailer
#[tokio::test]
async fn test_missing_email_body_is_invalid() {
    let mailer = RecordingMailer::new();
    let dispatcher = dispatcher(2, Arc::clone(&mailer));

    let result = dispatcher
        .dispatch(notification(
            "welcome",
            "email",
            "instant",
            serde_json::json!({ "emailAddress": "user@x.com" }),
        ))
        .await;

    assert!(matches!(result, Err(DispatchError::InvalidMetadata { .. })));
    assert!(mailer.sent_messages().await.is_empty());
}

/// Test: An unrecognized delivery route is unroutable regardless of type
#[tokio::test]
async fn test_unknown_route_is_unroutable() {
    let dispatcher = dispatcher(2, RecordingMailer::new());

    for kind in ["instant", "batch"] {
        let result = dispatcher
            .dispatch(notification(
                "welcome",
                "sms",
                kind,
                email_metadata("user@x.com", "hello"),
            ))
            .await;

        assert!(matches!(
            result,
            Err(DispatchError::UnroutableNotification { .. })
        ));
    }
}

/// Test: The email route with an unrecognized type is unroutable
#[tokio::test]
async fn test_unknown_type_on_email_route_is_unroutable() {
    let dispatcher = dispatcher(2, RecordingMailer::new());

    let result = dispatcher
        .dispatch(notification(
            "welcome",
            "email",
            "digest",
            email_metadata("user@x.com", "hello"),
        ))
        .await;

    assert!(matches!(
        result,
        Err(DispatchError::UnroutableNotification { .. })
    ));
}

/// Test: A store error surfaces as PersistenceFailed
#[tokio::test]
async fn test_store_failure_surfaces_as_persistence_failed() {
    let dispatcher = Dispatcher::new(2, RecordingMailer::new(), Arc::new(FailingStore));

    let result = dispatcher
        .dispatch(notification(
            "maintenance",
            "system",
            "instant",
            serde_json::json!({ "uuid": Uuid::new_v4(), "body": "note" }),
        ))
        .await;

    assert!(matches!(result, Err(DispatchError::PersistenceFailed(_))));
}
