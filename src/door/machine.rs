use super::state::{DoorPosition, DoorState};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Result of an external target write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOutcome {
    /// Already at or moving toward the requested position
    Unchanged,
    /// A new transition started; the relay must be pulsed
    Started { from: DoorState, to: DoorState },
}

/// Door actuator state machine without any I/O.
///
/// Current state only changes through `request_target`, `check_timeout`,
/// `commit_observed` and `stop`. Time is supplied by the caller.
#[derive(Debug, Clone)]
pub struct DoorStateMachine {
    current: DoorState,
    target: DoorPosition,
    transition_started: Option<Instant>,
    travel_time: Duration,
}

impl DoorStateMachine {
    pub fn new(initial: DoorPosition, travel_time: Duration) -> Self {
        Self {
            current: DoorState::from(initial),
            target: initial,
            transition_started: None,
            travel_time,
        }
    }

    pub fn current(&self) -> DoorState {
        self.current
    }

    pub fn target(&self) -> DoorPosition {
        self.target
    }

    pub fn transition_started(&self) -> Option<Instant> {
        self.transition_started
    }

    /// Apply an externally requested target position
    pub fn request_target(&mut self, target: DoorPosition, now: Instant) -> TargetOutcome {
        if self.current.settles_on(target) {
            debug!(
                "Target {} already satisfied by current state {}",
                target, self.current
            );
            return TargetOutcome::Unchanged;
        }

        let from = self.current;
        let to = DoorState::moving_toward(target);
        self.current = to;
        self.target = target;
        self.transition_started = Some(now);

        info!("Door target set to {}: {} -> {}", target, from, to);
        TargetOutcome::Started { from, to }
    }

    /// Force completion of a transition that outlived the travel-time budget.
    ///
    /// Returns the new current state when a forced completion happened.
    pub fn check_timeout(&mut self, now: Instant) -> Option<DoorState> {
        if self.current.stable_position() == Some(self.target)
            || self.current == DoorState::Stopped
        {
            return None;
        }

        let started = self.transition_started?;
        let elapsed = now.saturating_duration_since(started);
        if elapsed <= self.travel_time {
            return None;
        }

        let completed = DoorState::from(self.target);
        info!(
            "Gate transition timed out after {:?}; assuming {}",
            elapsed, completed
        );
        self.current = completed;
        Some(completed)
    }

    /// Vision-confirmed position; overrides any transitional assumption
    pub fn commit_observed(&mut self, position: DoorPosition) -> DoorState {
        let previous = self.current;
        self.current = DoorState::from(position);
        self.target = position;
        previous
    }

    /// Manual override; suspends timeout enforcement until a new target arrives
    pub fn stop(&mut self) -> DoorState {
        let previous = self.current;
        self.current = DoorState::Stopped;
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRAVEL: Duration = Duration::from_secs(30);

    #[test]
    fn test_target_equal_to_current_is_noop() {
        let now = Instant::now();
        let mut machine = DoorStateMachine::new(DoorPosition::Closed, TRAVEL);

        assert_eq!(
            machine.request_target(DoorPosition::Closed, now),
            TargetOutcome::Unchanged
        );
        assert_eq!(machine.current(), DoorState::Closed);
        assert_eq!(machine.target(), DoorPosition::Closed);
        assert!(machine.transition_started().is_none());
    }

    #[test]
    fn test_open_to_closed_starts_closing() {
        let start = Instant::now();
        let mut machine = DoorStateMachine::new(DoorPosition::Open, TRAVEL);

        let outcome = machine.request_target(DoorPosition::Closed, start);
        assert_eq!(
            outcome,
            TargetOutcome::Started {
                from: DoorState::Open,
                to: DoorState::Closing
            }
        );
        assert_eq!(machine.current(), DoorState::Closing);
        assert_eq!(machine.target(), DoorPosition::Closed);
        assert_eq!(machine.transition_started(), Some(start));
    }

    #[test]
    fn test_repeated_target_while_converging_is_noop() {
        let start = Instant::now();
        let mut machine = DoorStateMachine::new(DoorPosition::Open, TRAVEL);
        machine.request_target(DoorPosition::Closed, start);

        let later = start + Duration::from_secs(5);
        assert_eq!(
            machine.request_target(DoorPosition::Closed, later),
            TargetOutcome::Unchanged
        );
        assert_eq!(machine.transition_started(), Some(start));
    }

    #[test]
    fn test_reversal_restarts_timer() {
        let start = Instant::now();
        let mut machine = DoorStateMachine::new(DoorPosition::Open, TRAVEL);
        machine.request_target(DoorPosition::Closed, start);

        let later = start + Duration::from_secs(5);
        assert!(matches!(
            machine.request_target(DoorPosition::Open, later),
            TargetOutcome::Started {
                from: DoorState::Closing,
                to: DoorState::Opening
            }
        ));
        assert_eq!(machine.transition_started(), Some(later));
    }

    #[test]
    fn test_closing_times_out_to_closed() {
        let start = Instant::now();
        let mut machine = DoorStateMachine::new(DoorPosition::Open, TRAVEL);
        machine.request_target(DoorPosition::Closed, start);

        // Exactly at the budget nothing happens
        assert_eq!(machine.check_timeout(start + TRAVEL), None);
        assert_eq!(machine.current(), DoorState::Closing);

        let late = start + TRAVEL + Duration::from_millis(1);
        assert_eq!(machine.check_timeout(late), Some(DoorState::Closed));
        assert_eq!(machine.current(), DoorState::Closed);

        // Settled; further ticks are no-ops
        assert_eq!(machine.check_timeout(late + TRAVEL * 2), None);
    }

    #[test]
    fn test_stopped_never_times_out() {
        let start = Instant::now();
        let mut machine = DoorStateMachine::new(DoorPosition::Closed, TRAVEL);
        machine.request_target(DoorPosition::Open, start);
        assert_eq!(machine.stop(), DoorState::Opening);

        assert_eq!(machine.check_timeout(start + TRAVEL * 100), None);
        assert_eq!(machine.current(), DoorState::Stopped);
    }

    #[test]
    fn test_stopped_resolved_by_new_target() {
        let start = Instant::now();
        let mut machine = DoorStateMachine::new(DoorPosition::Closed, TRAVEL);
        machine.request_target(DoorPosition::Open, start);
        machine.stop();

        let later = start + Duration::from_secs(1);
        assert!(matches!(
            machine.request_target(DoorPosition::Open, later),
            TargetOutcome::Started {
                from: DoorState::Stopped,
                to: DoorState::Opening
            }
        ));
    }

    #[test]
    fn test_vision_commit_overrides_transition() {
        let start = Instant::now();
        let mut machine = DoorStateMachine::new(DoorPosition::Closed, TRAVEL);
        machine.request_target(DoorPosition::Open, start);

        let previous = machine.commit_observed(DoorPosition::Closed);
        assert_eq!(previous, DoorState::Opening);
        assert_eq!(machine.current(), DoorState::Closed);
        assert_eq!(machine.target(), DoorPosition::Closed);
        assert_eq!(machine.check_timeout(start + TRAVEL * 2), None);
    }
}
