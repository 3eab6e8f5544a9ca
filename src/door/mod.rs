mod actuator;
mod controller;
mod debounce;
mod machine;
mod state;

pub use actuator::{Actuator, LoggingRelay, MockRelay, SysfsRelay};
pub use controller::{DoorController, DoorSnapshot};
pub use debounce::{DebounceReconciler, DebounceVote};
pub use machine::{DoorStateMachine, TargetOutcome};
pub use state::{DoorPosition, DoorState};
