use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::models::notification::EmailMetadata;

/// Result of offering one email to an event's batch queue.
#[derive(Debug, Clone, PartialEq)]
pub enum FlushResult {
    /// The queue grew without reaching the threshold.
    Accumulated { pending: usize },
    /// The threshold was reached; the queue has been drained into one merged
    /// send addressed to the oldest member of the batch.
    Flushed { address: String, body: String },
}

/// Per-event accumulation of pending batched emails.
///
/// Each event name owns its own lock, so offers for one event are strictly
/// ordered while offers for unrelated events proceed in parallel. The outer
/// map lock is held only long enough to look up or create an event's entry.
/// Queue state is in-process and volatile; it is lost on restart.
pub struct BatchAggregator {
    batch_amount: usize,
    queues: Mutex<HashMap<String, Arc<Mutex<Vec<EmailMetadata>>>>>,
}

impl BatchAggregator {
    /// `batch_amount` must be positive; configuration loading rejects zero.
    pub fn new(batch_amount: usize) -> Self {
        Self {
            batch_amount,
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Appends one email to the event's queue. The offer that brings the
    /// queue length to exactly the threshold drains the whole queue and
    /// returns the merged send; every other offer only accumulates.
    pub async fn offer(&self, event_name: &str, email: EmailMetadata) -> FlushResult {
        let queue = self.queue_for(event_name).await;
        let mut queue = queue.lock().await;

        queue.push(email);

        if queue.len() == self.batch_amount {
            let drained = std::mem::take(&mut *queue);
            drop(queue);

            // The destination is the address of the first queued member, not
            // the one that triggered the flush.
            let address = drained[0].email_address.clone();

            let mut body = String::new();
            for email in &drained {
                body.push_str(&email.email_body);
                body.push('\n');
            }

            info!(
                event = event_name,
                batch_size = drained.len(),
                "Batch threshold reached, flushing"
            );

            FlushResult::Flushed { address, body }
        } else {
            debug!(
                event = event_name,
                pending = queue.len(),
                threshold = self.batch_amount,
                "Batched notification accumulated"
            );

            FlushResult::Accumulated {
                pending: queue.len(),
            }
        }
    }

    /// Current queue depth for an event. Zero for events never offered to.
    pub async fn pending(&self, event_name: &str) -> usize {
        let queue = {
            let queues = self.queues.lock().await;
            queues.get(event_name).cloned()
        };

        match queue {
            Some(queue) => queue.lock().await.len(),
            None => 0,
        }
    }

    async fn queue_for(&self, event_name: &str) -> Arc<Mutex<Vec<EmailMetadata>>> {
        let mut queues = self.queues.lock().await;
        Arc::clone(queues.entry(event_name.to_string()).or_default())
    }
}
