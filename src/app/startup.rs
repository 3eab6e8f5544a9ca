use super::orchestrator::{COMPONENT_API, COMPONENT_DOOR, COMPONENT_PIPELINE};
use super::{ComponentState, GateOrchestrator};
use crate::error::Result;
use tracing::{info, warn};

#[cfg(feature = "api")]
use crate::{
    api::{ApiServer, ApiState},
    events::GateEvent,
};
#[cfg(feature = "api")]
use std::sync::Arc;
#[cfg(feature = "api")]
use tracing::error;

impl GateOrchestrator {
    /// Register components and put the relay into its released level
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing gatecam components");

        let mut states = self.component_states.lock().await;
        states.insert(COMPONENT_DOOR.to_string(), ComponentState::Stopped);
        if self.pipeline.is_some() {
            states.insert(COMPONENT_PIPELINE.to_string(), ComponentState::Stopped);
        }
        if cfg!(feature = "api") && self.config.api.enabled {
            states.insert(COMPONENT_API.to_string(), ComponentState::Stopped);
        }
        drop(states);

        self.door.release().await?;

        info!(
            "Door initialized as {} (target {})",
            self.door.current_state(),
            self.door.target_state()
        );
        Ok(())
    }

    /// Start the HTTP surface and mark the control loop components running
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting gatecam system");

        self.set_component_state(COMPONENT_DOOR, ComponentState::Running)
            .await;

        if self.pipeline.is_some() {
            self.set_component_state(COMPONENT_PIPELINE, ComponentState::Running)
                .await;
        } else {
            warn!("Camera inference unavailable; gate is driven by target writes only");
        }

        #[cfg(feature = "api")]
        if self.config.api.enabled {
            self.set_component_state(COMPONENT_API, ComponentState::Starting)
                .await;

            let state = ApiState::new(
                self.door.clone(),
                self.pipeline.as_ref().map(|pipeline| pipeline.status_handle()),
                Arc::clone(&self.event_bus),
            );
            let server = ApiServer::new(self.config.api.clone(), state);
            let token = self.cancellation_token.clone();
            let event_bus = Arc::clone(&self.event_bus);

            self.api_task = Some(tokio::spawn(async move {
                if let Err(e) = server.serve(token).await {
                    error!("Gate API error: {}", e);
                    let _ = event_bus.publish(GateEvent::SystemError {
                        component: COMPONENT_API.to_string(),
                        error: e.to_string(),
                    });
                }
            }));

            self.set_component_state(COMPONENT_API, ComponentState::Running)
                .await;
            info!(
                "Gate API started on {}:{}",
                self.config.api.ip, self.config.api.port
            );
        }

        info!("Gatecam system started successfully");
        Ok(())
    }
}
