mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod types;


pub use orchestrator::{GateOrchestrator, COMPONENT_API, COMPONENT_DOOR, COMPONENT_PIPELINE};
pub use types::{ComponentState, ShutdownReason};
