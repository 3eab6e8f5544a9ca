use crate::door::{DoorPosition, DoorState};
use crate::error::EventBusError;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// What caused a door state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// External target write from the automation framework
    TargetRequested,
    /// Travel-time budget elapsed without confirmation
    TravelTimeout,
    /// Debounced camera classification
    VisionConfirmed,
    /// Manual stop override
    Stopped,
    /// Relay pulse failed; the requested transition was undone
    RelayFailed,
}

/// Events that can occur in the gatecam system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GateEvent {
    /// Current door state changed
    DoorStateChanged {
        from: DoorState,
        to: DoorState,
        cause: TransitionCause,
        timestamp: SystemTime,
    },
    /// A camera frame was classified
    FrameClassified {
        label: DoorPosition,
        prob_closed: f32,
        prob_open: f32,
        timestamp: SystemTime,
    },
    /// A sampling cycle was aborted
    CycleFailed { stage: String, error: String },
    /// A system error occurred in a component
    SystemError { component: String, error: String },
    /// System shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl GateEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            GateEvent::DoorStateChanged {
                from, to, cause, ..
            } => {
                format!("Door {} -> {} ({:?})", from, to, cause)
            }
            GateEvent::FrameClassified {
                label,
                prob_closed,
                prob_open,
                ..
            } => {
                format!(
                    "Gate is {} (scores: {:.2}, {:.2})",
                    label, prob_closed, prob_open
                )
            }
            GateEvent::CycleFailed { stage, error } => {
                format!("Sampling cycle failed during {}: {}", stage, error)
            }
            GateEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
            GateEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            GateEvent::DoorStateChanged { .. } => "door_state_changed",
            GateEvent::FrameClassified { .. } => "frame_classified",
            GateEvent::CycleFailed { .. } => "cycle_failed",
            GateEvent::SystemError { .. } => "system_error",
            GateEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Async event bus for component coordination using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<GateEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            debug_logging: true,
        }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<GateEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers.
    ///
    /// Publishers log their own failures; only door transitions are logged here.
    pub fn publish(&self, event: GateEvent) -> Result<usize, EventBusError> {
        if let GateEvent::DoorStateChanged { .. } = &event {
            info!("{}", event.description());
        } else if self.debug_logging {
            debug!("Publishing {}: {}", event.event_type(), event.description());
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
