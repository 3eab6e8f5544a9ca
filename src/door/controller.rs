use super::actuator::Actuator;
use super::debounce::{DebounceReconciler, DebounceVote};
use super::machine::{DoorStateMachine, TargetOutcome};
use super::state::{DoorPosition, DoorState};
use crate::config::DoorConfig;
use crate::error::{ActuatorError, Result};
use crate::events::{EventBus, GateEvent, TransitionCause};

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, error, info};

struct DoorInner {
    machine: DoorStateMachine,
    reconciler: DebounceReconciler,
}

/// Point-in-time view of the door for the automation framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DoorSnapshot {
    pub current: DoorState,
    pub current_code: u8,
    pub target: DoorPosition,
    pub target_code: u8,
    pub obstruction_detected: bool,
    pub debounce_streak: u32,
}

/// Shared handle owning the door state machine, debounce state and relay.
///
/// Cloned into the control loop and the HTTP handlers. The lock is never held
/// across an await; the relay pulse runs after the state change is recorded.
#[derive(Clone)]
pub struct DoorController {
    inner: Arc<Mutex<DoorInner>>,
    actuator: Arc<dyn Actuator>,
    event_bus: Arc<EventBus>,
    pulse: Duration,
}

impl DoorController {
    pub fn new(
        config: &DoorConfig,
        actuator: Arc<dyn Actuator>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        info!(
            "Configuring gate door: initial {}, travel time {:?}, debounce threshold {}, relay {}",
            config.initial_state,
            config.travel_time(),
            config.debounce_threshold,
            actuator.name()
        );

        Self {
            inner: Arc::new(Mutex::new(DoorInner {
                machine: DoorStateMachine::new(config.initial_state, config.travel_time()),
                reconciler: DebounceReconciler::new(config.debounce_threshold),
            })),
            actuator,
            event_bus,
            pulse: config.pulse(),
        }
    }

    pub fn current_state(&self) -> DoorState {
        self.inner.lock().machine.current()
    }

    pub fn target_state(&self) -> DoorPosition {
        self.inner.lock().machine.target()
    }

    /// No obstruction sensor is wired; always false
    pub fn obstruction_detected(&self) -> bool {
        false
    }

    pub fn snapshot(&self) -> DoorSnapshot {
        let inner = self.inner.lock();
        let current = inner.machine.current();
        let target = inner.machine.target();
        DoorSnapshot {
            current,
            current_code: current.code(),
            target,
            target_code: target.code(),
            obstruction_detected: self.obstruction_detected(),
            debounce_streak: inner.reconciler.streak(),
        }
    }

    /// Put the relay into its released level
    pub async fn release(&self) -> Result<()> {
        self.actuator.release().await?;
        Ok(())
    }

    /// External target write using the framework's numeric code (0 open, 1 closed)
    pub async fn set_target_code(&self, code: u8) -> Result<TargetOutcome> {
        let target =
            DoorPosition::from_code(code).ok_or(ActuatorError::InvalidTarget { code })?;
        self.set_target(target).await
    }

    /// External target write; pulses the relay when a new transition starts.
    ///
    /// The pulse runs on its own task so the relay is always released even if
    /// the caller's future is dropped. A failed pulse restores the previous
    /// door state.
    pub async fn set_target(&self, target: DoorPosition) -> Result<TargetOutcome> {
        let now = Instant::now();
        let (outcome, previous) = {
            let mut inner = self.inner.lock();
            let previous = inner.machine.clone();
            let outcome = inner.machine.request_target(target, now);
            if matches!(outcome, TargetOutcome::Started { .. }) {
                inner.reconciler.reset();
            }
            (outcome, previous)
        };

        let TargetOutcome::Started { from, to } = outcome else {
            return Ok(outcome);
        };

        match target {
            DoorPosition::Open => info!("HomeKit: Opening Gate"),
            DoorPosition::Closed => info!("HomeKit: Closing Gate"),
        }
        self.notify(from, to, TransitionCause::TargetRequested);

        let actuator = Arc::clone(&self.actuator);
        let pulse = self.pulse;
        let result = match tokio::spawn(async move { actuator.pulse(pulse).await }).await {
            Ok(result) => result,
            Err(e) => Err(ActuatorError::Task {
                details: e.to_string(),
            }),
        };

        if let Err(e) = result {
            error!("Relay pulse failed: {}", e);
            self.rollback(previous, now);
            self.publish(GateEvent::SystemError {
                component: "door_actuator".to_string(),
                error: e.to_string(),
            });
            return Err(e.into());
        }

        Ok(outcome)
    }

    /// Undo a transition whose relay press never happened, unless something
    /// else has moved the door since
    fn rollback(&self, previous: DoorStateMachine, started: Instant) {
        let restored = {
            let mut inner = self.inner.lock();
            if inner.machine.transition_started() != Some(started)
                || !inner.machine.current().is_transitional()
            {
                return;
            }
            let interrupted = inner.machine.current();
            inner.machine = previous;
            (interrupted, inner.machine.current())
        };

        info!("Door restored to {} after failed relay pulse", restored.1);
        self.notify(restored.0, restored.1, TransitionCause::RelayFailed);
    }

    /// Manual override into the stopped state
    pub fn stop(&self) -> DoorState {
        let previous = {
            let mut inner = self.inner.lock();
            inner.reconciler.reset();
            inner.machine.stop()
        };

        if previous != DoorState::Stopped {
            self.notify(previous, DoorState::Stopped, TransitionCause::Stopped);
        }
        previous
    }

    /// Control-loop tick: enforce the travel-time budget
    pub fn tick(&self, now: Instant) -> Option<DoorState> {
        let (previous, forced) = {
            let mut inner = self.inner.lock();
            let previous = inner.machine.current();
            (previous, inner.machine.check_timeout(now))
        };

        if let Some(state) = forced {
            self.notify(previous, state, TransitionCause::TravelTimeout);
        }
        forced
    }

    /// Feed one classification label through the debounce reconciler
    pub fn reconcile(&self, observed: DoorPosition) -> DebounceVote {
        let (vote, previous) = {
            let mut inner = self.inner.lock();
            let current = inner.machine.current();
            let vote = inner.reconciler.observe(current, observed);
            let previous = match vote {
                DebounceVote::Commit(position) => Some(inner.machine.commit_observed(position)),
                _ => None,
            };
            (vote, previous)
        };

        match (vote, previous) {
            (DebounceVote::Commit(position), Some(previous)) => {
                info!("HomeKit: Syncing -> {}", position.as_str().to_uppercase());
                self.notify(
                    previous,
                    DoorState::from(position),
                    TransitionCause::VisionConfirmed,
                );
            }
            (DebounceVote::Suspended, _) => {
                debug!("Door in motion; ignoring vision label {}", observed);
            }
            _ => {}
        }

        vote
    }

    fn notify(&self, from: DoorState, to: DoorState, cause: TransitionCause) {
        self.publish(GateEvent::DoorStateChanged {
            from,
            to,
            cause,
            timestamp: SystemTime::now(),
        });
    }

    fn publish(&self, event: GateEvent) {
        if let Err(e) = self.event_bus.publish(event) {
            debug!("Door event not delivered: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::door::actuator::{MockRelay, SysfsRelay};

    fn test_config(initial: DoorPosition) -> DoorConfig {
        DoorConfig {
            relay_device: None,
            active_low: true,
            pulse_ms: 1,
            travel_time_ms: 30_000,
            debounce_threshold: 2,
            initial_state: initial,
            control_tick_ms: 250,
        }
    }

    fn controller(initial: DoorPosition) -> (DoorController, MockRelay, Arc<EventBus>) {
        let relay = MockRelay::new();
        let event_bus = Arc::new(EventBus::new(16));
        let controller = DoorController::new(
            &test_config(initial),
            Arc::new(relay.clone()),
            Arc::clone(&event_bus),
        );
        (controller, relay, event_bus)
    }

    #[tokio::test]
    async fn test_set_target_pulses_relay_once() {
        let (door, relay, _bus) = controller(DoorPosition::Open);

        let outcome = door.set_target(DoorPosition::Closed).await.unwrap();
        assert!(matches!(outcome, TargetOutcome::Started { .. }));
        assert_eq!(door.current_state(), DoorState::Closing);
        assert_eq!(relay.pulse_count(), 1);

        // Converging already; no second press
        let outcome = door.set_target(DoorPosition::Closed).await.unwrap();
        assert_eq!(outcome, TargetOutcome::Unchanged);
        assert_eq!(relay.pulse_count(), 1);
    }

    #[tokio::test]
    async fn test_target_equal_to_current_does_not_pulse() {
        let (door, relay, _bus) = controller(DoorPosition::Closed);

        let outcome = door.set_target_code(1).await.unwrap();
        assert_eq!(outcome, TargetOutcome::Unchanged);
        assert_eq!(relay.pulse_count(), 0);
        assert_eq!(door.snapshot().current_code, 1);
    }

    #[tokio::test]
    async fn test_invalid_target_code() {
        let (door, relay, _bus) = controller(DoorPosition::Closed);

        let result = door.set_target_code(3).await;
        assert!(matches!(
            result,
            Err(crate::error::GatecamError::Actuator(
                ActuatorError::InvalidTarget { code: 3 }
            ))
        ));
        assert_eq!(relay.pulse_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_completes_without_pulse() {
        let (door, relay, _bus) = controller(DoorPosition::Open);
        door.set_target(DoorPosition::Closed).await.unwrap();

        let late = Instant::now() + Duration::from_secs(31);
        assert_eq!(door.tick(late), Some(DoorState::Closed));
        assert_eq!(door.current_state(), DoorState::Closed);
        assert_eq!(relay.pulse_count(), 1);
    }

    #[tokio::test]
    async fn test_stopped_suspends_timeout() {
        let (door, _relay, _bus) = controller(DoorPosition::Open);
        door.set_target(DoorPosition::Closed).await.unwrap();
        assert_eq!(door.stop(), DoorState::Closing);

        let late = Instant::now() + Duration::from_secs(3600);
        assert_eq!(door.tick(late), None);
        assert_eq!(door.current_state(), DoorState::Stopped);
    }

    #[tokio::test]
    async fn test_reconcile_commits_and_notifies() {
        let (door, relay, bus) = controller(DoorPosition::Closed);
        let mut events = bus.subscribe();

        assert_eq!(
            door.reconcile(DoorPosition::Open),
            DebounceVote::Disagree { streak: 1 }
        );
        assert_eq!(door.current_state(), DoorState::Closed);

        assert_eq!(
            door.reconcile(DoorPosition::Open),
            DebounceVote::Commit(DoorPosition::Open)
        );
        assert_eq!(door.current_state(), DoorState::Open);
        assert_eq!(door.target_state(), DoorPosition::Open);
        assert_eq!(relay.pulse_count(), 0);

        match events.try_recv().unwrap() {
            GateEvent::DoorStateChanged { from, to, cause, .. } => {
                assert_eq!(from, DoorState::Closed);
                assert_eq!(to, DoorState::Open);
                assert_eq!(cause, TransitionCause::VisionConfirmed);
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dropped_target_write_still_releases_relay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("value");
        let mut config = test_config(DoorPosition::Closed);
        config.pulse_ms = 200;
        let door = DoorController::new(
            &config,
            Arc::new(SysfsRelay::new(path.to_string_lossy(), true)),
            Arc::new(EventBus::new(16)),
        );

        // Caller gives up while the relay is still held
        let abandoned =
            tokio::time::timeout(Duration::from_millis(20), door.set_target(DoorPosition::Open))
                .await;
        assert!(abandoned.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0");

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1");
        assert_eq!(door.current_state(), DoorState::Opening);
    }

    #[tokio::test]
    async fn test_failed_pulse_restores_state() {
        let bus = Arc::new(EventBus::new(16));
        let mut events = bus.subscribe();
        let door = DoorController::new(
            &test_config(DoorPosition::Closed),
            Arc::new(SysfsRelay::new("/nonexistent/gpio/value", true)),
            Arc::clone(&bus),
        );

        let result = door.set_target(DoorPosition::Open).await;
        assert!(matches!(
            result,
            Err(crate::error::GatecamError::Actuator(ActuatorError::Write { .. }))
        ));
        assert_eq!(door.current_state(), DoorState::Closed);
        assert_eq!(door.target_state(), DoorPosition::Closed);

        // Nothing left for the travel timeout to complete
        let late = Instant::now() + Duration::from_secs(31);
        assert_eq!(door.tick(late), None);
        assert_eq!(door.current_state(), DoorState::Closed);

        let mut causes = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let GateEvent::DoorStateChanged { cause, to, .. } = event {
                causes.push((cause, to));
            }
        }
        assert_eq!(
            causes,
            vec![
                (TransitionCause::TargetRequested, DoorState::Opening),
                (TransitionCause::RelayFailed, DoorState::Closed),
            ]
        );
    }

    #[tokio::test]
    async fn test_reconcile_ignored_while_moving() {
        let (door, _relay, _bus) = controller(DoorPosition::Closed);
        door.set_target(DoorPosition::Open).await.unwrap();

        for _ in 0..5 {
            assert_eq!(
                door.reconcile(DoorPosition::Closed),
                DebounceVote::Suspended
            );
        }
        assert_eq!(door.current_state(), DoorState::Opening);
    }
}
