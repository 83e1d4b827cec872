use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::{
    clients::{health::HealthChecker, mailer::Mailer, store::NotificationStore},
    config::Config,
    dispatch::Dispatcher,
    models::{
        health::HealthStatus,
        notification::Notification,
        outcome::DispatchError,
        response::ApiResponse,
    },
};

pub struct AppState {
    dispatcher: Dispatcher,
    store: Arc<dyn NotificationStore>,
    health_checker: HealthChecker,
}

pub async fn run_api_server(
    config: Config,
    mailer: Arc<dyn Mailer>,
    store: Arc<dyn NotificationStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState {
        dispatcher: Dispatcher::new(config.batch_amount, Arc::clone(&mailer), Arc::clone(&store)),
        health_checker: HealthChecker::new(mailer, Arc::clone(&store)),
        store,
    });

    let app = Router::new()
        .route(
            "/notifications",
            post(dispatch_notification).get(list_notifications),
        )
        .route("/notifications/{id}", delete(remove_notification))
        .route("/notifications/{id}/read", put(mark_notification_read))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = TcpListener::bind(&addr).await?;

    info!(address = %addr, "Notification API server started");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn dispatch_notification(
    State(state): State<Arc<AppState>>,
    Json(notification): Json<Notification>,
) -> impl IntoResponse {
    match state.dispatcher.dispatch(notification).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                outcome,
                "Notification received".to_string(),
            )),
        ),
        Err(e) => (
            error_status(&e),
            Json(ApiResponse::error(
                e.to_string(),
                "Notification rejected".to_string(),
            )),
        ),
    }
}

/// Validation and classification failures are the caller's fault;
/// collaborator failures are ours.
fn error_status(error: &DispatchError) -> StatusCode {
    match error {
        DispatchError::InvalidMetadata { .. } | DispatchError::UnroutableNotification { .. } => {
            StatusCode::BAD_REQUEST
        }
        DispatchError::DeliveryFailed(_) | DispatchError::PersistenceFailed(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn list_notifications(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.get_all().await {
        Ok(notifications) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                notifications,
                "Notifications retrieved".to_string(),
            )),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(
                e.to_string(),
                "Failed to get notifications".to_string(),
            )),
        ),
    }
}

async fn remove_notification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.store.remove(id).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                (),
                "Notification removed".to_string(),
            )),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(
                e.to_string(),
                "Failed to remove notification".to_string(),
            )),
        ),
    }
}

async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.store.mark_as_read(id).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                (),
                "Notification marked as read".to_string(),
            )),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(
                e.to_string(),
                "Failed to mark notification as read".to_string(),
            )),
        ),
    }
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_checker.check_all().await;

    let status_code = match health.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}
