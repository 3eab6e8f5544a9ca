mod handlers;
mod server;
#[cfg(test)]
mod tests;

pub use handlers::{TargetRequest, TargetValue};
pub use server::{ApiServer, ApiState};
