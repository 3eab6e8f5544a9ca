use super::orchestrator::COMPONENT_PIPELINE;
use super::{ComponentState, GateOrchestrator, ShutdownReason};
use crate::error::{GatecamError, Result};
use crate::events::GateEvent;
use crate::pipeline::CycleOutcome;
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

impl GateOrchestrator {
    /// Run the control loop until a signal or cancellation, then shut down
    pub async fn run(&mut self) -> Result<i32> {
        info!("Gatecam system is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| GatecamError::system("Shutdown sender already taken"))?;

        let mut shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| GatecamError::system("Shutdown receiver already taken"))?;

        self.setup_signal_handlers(shutdown_sender);

        let shutdown_reason = self.control_loop(&mut shutdown_receiver).await;
        info!("Shutdown initiated: {:?}", shutdown_reason);

        let _ = self.event_bus.publish(GateEvent::ShutdownRequested {
            timestamp: SystemTime::now(),
            reason: format!("{:?}", shutdown_reason),
        });

        let exit_code = self.shutdown().await?;

        info!("Gatecam system shutdown complete");
        Ok(exit_code)
    }

    /// Single control loop: actuator timeout ticks and sampling cycles
    async fn control_loop(
        &mut self,
        shutdown: &mut oneshot::Receiver<ShutdownReason>,
    ) -> ShutdownReason {
        let mut control_tick = interval(self.config.door.control_tick());
        control_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut sampling = interval(self.config.sampling.interval());
        sampling.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let token = self.cancellation_token.clone();

        loop {
            let sampling_enabled = self.has_pipeline();

            tokio::select! {
                reason = &mut *shutdown => {
                    return reason.unwrap_or_else(|_| {
                        ShutdownReason::Error("Shutdown channel closed unexpectedly".to_string())
                    });
                }
                _ = token.cancelled() => {
                    return ShutdownReason::UserRequest;
                }
                _ = control_tick.tick() => {
                    self.door.tick(Instant::now());
                }
                _ = sampling.tick(), if sampling_enabled => {
                    self.sample().await;
                }
            }
        }
    }

    /// One sampling cycle; only a classified frame reaches the reconciler
    pub(super) async fn sample(&mut self) {
        let Some(pipeline) = self.pipeline.as_mut() else {
            return;
        };

        match pipeline.run_cycle().await {
            Ok(CycleOutcome::Classified(report)) => {
                let vote = self.door.reconcile(report.label);
                debug!("Vision label {} -> {:?}", report.label, vote);
            }
            Ok(CycleOutcome::NoSamples { .. }) => {}
            Err(e) => debug!("Door state untouched after aborted cycle: {}", e),
        }

        if !pipeline.is_enabled() {
            warn!("Inference pipeline disabled; continuing actuator-only");
            self.set_component_state(COMPONENT_PIPELINE, ComponentState::Failed)
                .await;
        }
    }

    /// Set up signal handlers for graceful shutdown
    fn setup_signal_handlers(&self, shutdown_sender: oneshot::Sender<ShutdownReason>) {
        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));

        // Handle SIGTERM (systemd stop) - Unix only
        #[cfg(unix)]
        {
            let shutdown_sender_sigterm = Arc::clone(&shutdown_sender);
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate())
                {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        warn!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };

                if sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    if let Some(sender) = shutdown_sender_sigterm.lock().await.take() {
                        let _ = sender.send(ShutdownReason::Signal("SIGTERM".to_string()));
                    }
                }
            });
        }

        // Handle SIGINT (Ctrl+C) - Cross-platform
        let shutdown_sender_sigint = Arc::clone(&shutdown_sender);
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                if let Some(sender) = shutdown_sender_sigint.lock().await.take() {
                    let _ = sender.send(ShutdownReason::Signal("SIGINT".to_string()));
                }
            }
        });
    }
}
