use std::{collections::HashMap, sync::Arc, time::Instant};

use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    clients::{mailer::Mailer, store::NotificationStore},
    models::health::{HealthCheckResponse, HealthStatus, ServiceHealth},
};

pub struct HealthChecker {
    mailer: Arc<dyn Mailer>,
    store: Arc<dyn NotificationStore>,
}

impl HealthChecker {
    pub fn new(mailer: Arc<dyn Mailer>, store: Arc<dyn NotificationStore>) -> Self {
        Self { mailer, store }
    }

    pub async fn check_all(&self) -> HealthCheckResponse {
        let mut checks = HashMap::new();

        let store_health = self.check_store().await;
        checks.insert("notification_store".to_string(), store_health);

        let mailer_health = self.check_mailer().await;
        checks.insert("email_transport".to_string(), mailer_health);

        let status = Self::determine_overall_status(&checks);

        HealthCheckResponse {
            status,
            timestamp: Utc::now(),
            checks,
        }
    }

    async fn check_store(&self) -> ServiceHealth {
        let start = Instant::now();

        match self.store.health_check().await {
            Ok(_) => {
                let elapsed = start.elapsed().as_millis() as u64;
                debug!(response_time_ms = elapsed, "Store health check passed");
                ServiceHealth::healthy(elapsed)
            }
            Err(e) => {
                warn!(error = %e, "Store health check failed");
                ServiceHealth::unhealthy(format!("Health check failed: {}", e))
            }
        }
    }

    async fn check_mailer(&self) -> ServiceHealth {
        let start = Instant::now();

        match self.mailer.probe().await {
            Ok(_) => {
                let elapsed = start.elapsed().as_millis() as u64;
                debug!(response_time_ms = elapsed, "Email transport probe passed");
                ServiceHealth::healthy(elapsed)
            }
            Err(e) => {
                warn!(error = %e, "Email transport probe failed");
                ServiceHealth::unhealthy(format!("Probe failed: {}", e))
            }
        }
    }

    /// An unreachable store makes the service unhealthy; an unreachable email
    /// transport only degrades it, since system notifications still persist.
    fn determine_overall_status(checks: &HashMap<String, ServiceHealth>) -> HealthStatus {
        let store_unhealthy = checks
            .get("notification_store")
            .is_some_and(|health| health.status == HealthStatus::Unhealthy);

        if store_unhealthy {
            return HealthStatus::Unhealthy;
        }

        let any_impaired = checks
            .values()
            .any(|health| health.status != HealthStatus::Healthy);

        if any_impaired {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}
