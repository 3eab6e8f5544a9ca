use crate::error::ActuatorError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Physical remote-button relay driving the gate motor
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Hold the relay active for `duration`, then release it
    async fn pulse(&self, duration: Duration) -> Result<(), ActuatorError>;

    /// Drive the relay to its inactive level
    async fn release(&self) -> Result<(), ActuatorError>;

    fn name(&self) -> &str;
}

/// Relay wired to a GPIO exported through sysfs (`/sys/class/gpio/gpioN/value`)
pub struct SysfsRelay {
    device: String,
    active_low: bool,
}

impl SysfsRelay {
    pub fn new<S: Into<String>>(device: S, active_low: bool) -> Self {
        Self {
            device: device.into(),
            active_low,
        }
    }

    async fn write_level(&self, active: bool) -> Result<(), ActuatorError> {
        let high = active != self.active_low;
        let value: &[u8] = if high { b"1" } else { b"0" };

        tokio::fs::write(&self.device, value)
            .await
            .map_err(|source| ActuatorError::Write {
                device: self.device.clone(),
                source,
            })
    }
}

#[async_trait]
impl Actuator for SysfsRelay {
    async fn pulse(&self, duration: Duration) -> Result<(), ActuatorError> {
        debug!("Pulsing relay {} for {:?}", self.device, duration);
        self.write_level(true).await?;
        tokio::time::sleep(duration).await;
        self.write_level(false).await
    }

    async fn release(&self) -> Result<(), ActuatorError> {
        self.write_level(false).await
    }

    fn name(&self) -> &str {
        &self.device
    }
}

/// Stand-in for installations without a relay; only logs button presses
#[derive(Default)]
pub struct LoggingRelay;

#[async_trait]
impl Actuator for LoggingRelay {
    async fn pulse(&self, duration: Duration) -> Result<(), ActuatorError> {
        info!("Relay pulse requested ({:?}); no relay device configured", duration);
        Ok(())
    }

    async fn release(&self) -> Result<(), ActuatorError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "logging"
    }
}

/// Mock relay for testing without real hardware; counts pulses
#[derive(Clone, Default)]
pub struct MockRelay {
    pulses: Arc<AtomicUsize>,
}

impl MockRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pulse_count(&self) -> usize {
        self.pulses.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Actuator for MockRelay {
    async fn pulse(&self, _duration: Duration) -> Result<(), ActuatorError> {
        self.pulses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn release(&self) -> Result<(), ActuatorError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
