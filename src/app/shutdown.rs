use super::orchestrator::{COMPONENT_API, COMPONENT_DOOR, COMPONENT_PIPELINE};
use super::{ComponentState, GateOrchestrator};
use crate::error::{GatecamError, Result};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

impl GateOrchestrator {
    /// Perform graceful shutdown of all components
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        // Cancel all background tasks
        self.cancellation_token.cancel();

        let mut exit_code = 0;

        if let Err(e) = self.stop_api().await {
            error!("Error stopping api: {}", e);
            exit_code = 1;
        }

        if self.pipeline.is_some() {
            self.set_component_state(COMPONENT_PIPELINE, ComponentState::Stopped)
                .await;
        }

        if let Err(e) = self.stop_door().await {
            error!("Error stopping door: {}", e);
            exit_code = 1;
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    async fn stop_api(&mut self) -> Result<()> {
        let Some(task) = self.api_task.take() else {
            return Ok(());
        };

        info!("Stopping {} component", COMPONENT_API);
        self.set_component_state(COMPONENT_API, ComponentState::Stopping)
            .await;

        match timeout(STOP_TIMEOUT, task).await {
            Ok(Ok(())) => {
                self.set_component_state(COMPONENT_API, ComponentState::Stopped)
                    .await;
                info!("{} component stopped", COMPONENT_API);
                Ok(())
            }
            Ok(Err(e)) => {
                self.set_component_state(COMPONENT_API, ComponentState::Failed)
                    .await;
                Err(GatecamError::component(
                    COMPONENT_API.to_string(),
                    format!("task failed: {}", e),
                ))
            }
            Err(_) => {
                self.set_component_state(COMPONENT_API, ComponentState::Failed)
                    .await;
                error!("{} component stop timeout", COMPONENT_API);
                Err(GatecamError::system(format!(
                    "{} component stop timeout",
                    COMPONENT_API
                )))
            }
        }
    }

    /// Leave the relay released so the remote button is not held down
    async fn stop_door(&mut self) -> Result<()> {
        info!("Stopping {} component", COMPONENT_DOOR);
        self.set_component_state(COMPONENT_DOOR, ComponentState::Stopping)
            .await;

        match timeout(STOP_TIMEOUT, self.door.release()).await {
            Ok(Ok(())) => {
                self.set_component_state(COMPONENT_DOOR, ComponentState::Stopped)
                    .await;
                info!("{} component stopped", COMPONENT_DOOR);
                Ok(())
            }
            Ok(Err(e)) => {
                self.set_component_state(COMPONENT_DOOR, ComponentState::Failed)
                    .await;
                Err(e)
            }
            Err(_) => {
                self.set_component_state(COMPONENT_DOOR, ComponentState::Failed)
                    .await;
                error!("{} component stop timeout", COMPONENT_DOOR);
                Err(GatecamError::system(format!(
                    "{} component stop timeout",
                    COMPONENT_DOOR
                )))
            }
        }
    }
}
