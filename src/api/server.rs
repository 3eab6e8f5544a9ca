use crate::{
    config::ApiConfig,
    door::DoorController,
    error::ApiError,
    events::EventBus,
    pipeline::PipelineStatus,
};
use axum::{
    routing::{get, post},
    Router,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::handlers::{
    door_handler, health_handler, set_target_handler, status_handler, stop_handler,
};

/// Shared state for the Axum server
#[derive(Clone)]
pub struct ApiState {
    pub(crate) door: DoorController,
    pub(crate) pipeline: Option<Arc<Mutex<PipelineStatus>>>,
    pub(crate) event_bus: Arc<EventBus>,
}

impl ApiState {
    pub fn new(
        door: DoorController,
        pipeline: Option<Arc<Mutex<PipelineStatus>>>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            door,
            pipeline,
            event_bus,
        }
    }
}

/// HTTP control surface for the gate
pub struct ApiServer {
    pub(crate) config: ApiConfig,
    pub(crate) state: ApiState,
}

impl ApiServer {
    pub fn new(config: ApiConfig, state: ApiState) -> Self {
        Self { config, state }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(status_handler))
            .route("/status", get(status_handler))
            .route("/door", get(door_handler))
            .route("/door/target", post(set_target_handler))
            .route("/door/stop", post(stop_handler))
            .route("/health", get(health_handler))
            .with_state(self.state.clone())
    }

    /// Bind and serve until `shutdown` is cancelled
    pub async fn serve(&self, shutdown: CancellationToken) -> Result<(), ApiError> {
        let addr = format!("{}:{}", self.config.ip, self.config.port);

        let listener =
            tokio::net::TcpListener::bind(&addr)
                .await
                .map_err(|e| ApiError::BindFailed {
                    address: addr.clone(),
                    source: e,
                })?;

        info!("Gate API listening on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| ApiError::ServerFailed {
                details: format!("Server error: {}", e),
            })?;

        info!("Gate API on {} stopped", addr);
        Ok(())
    }
}
