use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::door::DoorPosition;
use crate::vision::{Roi, FEATURE_LEN};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GatecamConfig {
    pub camera: CameraConfig,
    pub roi: RoiConfig,
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    pub door: DoorConfig,
    pub api: ApiConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Snapshot URL returning a single JPEG image
    #[serde(default = "default_camera_url")]
    pub url: String,

    /// Basic auth user name (empty disables authentication)
    #[serde(default)]
    pub username: String,

    /// Basic auth password
    #[serde(default)]
    pub password: String,

    /// Capacity of the frame buffer; larger images are rejected
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,

    /// Time budget for receiving the full image body
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

/// Door bounding box in frame pixel coordinates, `[x, x1) × [y, y1)`
#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct RoiConfig {
    #[serde(default = "default_roi_x")]
    pub x: u32,
    #[serde(default = "default_roi_y")]
    pub y: u32,
    #[serde(default = "default_roi_x1")]
    pub x1: u32,
    #[serde(default = "default_roi_y1")]
    pub y1: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SamplingConfig {
    /// Interval between camera samples
    #[serde(default = "default_sampling_interval_ms")]
    pub interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClassifierConfig {
    /// ONNX model file; inference is disabled when absent
    pub model_path: Option<String>,

    /// Model input tensor shape; its element count must match the feature grid
    #[serde(default = "default_input_shape")]
    pub input_shape: Vec<usize>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            input_shape: default_input_shape(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DoorConfig {
    /// GPIO value file driving the remote-button relay; logs only when absent
    pub relay_device: Option<String>,

    /// Relay is energised by writing 0
    #[serde(default = "default_active_low")]
    pub active_low: bool,

    /// How long the relay is held active per button press
    #[serde(default = "default_pulse_ms")]
    pub pulse_ms: u64,

    /// Travel-time budget after which a transition is assumed complete
    #[serde(default = "default_travel_time_ms")]
    pub travel_time_ms: u64,

    /// Consecutive disagreeing classifications required to flip state
    #[serde(default = "default_debounce_threshold")]
    pub debounce_threshold: u32,

    /// State assumed at startup
    #[serde(default = "default_initial_state")]
    pub initial_state: DoorPosition,

    /// Control loop tick for timeout enforcement
    #[serde(default = "default_control_tick_ms")]
    pub control_tick_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    /// Serve the HTTP control surface
    #[serde(default = "default_api_enabled")]
    pub enabled: bool,

    /// IP address to bind to
    #[serde(default = "default_api_ip")]
    pub ip: String,

    /// Port to listen on
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Log every published event at debug level
    #[serde(default)]
    pub debug_events: bool,
}

impl RoiConfig {
    pub fn to_roi(&self) -> Roi {
        Roi::new(self.x, self.y, self.x1, self.y1)
    }
}

impl CameraConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl SamplingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl DoorConfig {
    pub fn pulse(&self) -> Duration {
        Duration::from_millis(self.pulse_ms)
    }

    pub fn travel_time(&self) -> Duration {
        Duration::from_millis(self.travel_time_ms)
    }

    pub fn control_tick(&self) -> Duration {
        Duration::from_millis(self.control_tick_ms)
    }
}

impl GatecamConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.url", default_camera_url())?
            .set_default("camera.username", "")?
            .set_default("camera.password", "")?
            .set_default("camera.max_image_bytes", default_max_image_bytes() as i64)?
            .set_default("camera.fetch_timeout_ms", default_fetch_timeout_ms())?
            .set_default("roi.x", default_roi_x())?
            .set_default("roi.y", default_roi_y())?
            .set_default("roi.x1", default_roi_x1())?
            .set_default("roi.y1", default_roi_y1())?
            .set_default("sampling.interval_ms", default_sampling_interval_ms())?
            .set_default("door.active_low", default_active_low())?
            .set_default("door.pulse_ms", default_pulse_ms())?
            .set_default("door.travel_time_ms", default_travel_time_ms())?
            .set_default("door.debounce_threshold", default_debounce_threshold())?
            .set_default("door.initial_state", "closed")?
            .set_default("door.control_tick_ms", default_control_tick_ms())?
            .set_default("api.enabled", default_api_enabled())?
            .set_default("api.ip", default_api_ip())?
            .set_default("api.port", default_api_port())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .set_default("system.debug_events", false)?
            .add_source(File::with_name(&path_str).required(false))
            // GATECAM_DOOR__TRAVEL_TIME_MS style overrides
            .add_source(
                Environment::with_prefix("GATECAM")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: GatecamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Render as TOML, as printed by `--print-config`
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| {
            ConfigError::Message(format!("Failed to serialize configuration: {}", e))
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.url.trim().is_empty() {
            return Err(ConfigError::Message(
                "Camera url must not be empty".to_string(),
            ));
        }

        if self.camera.max_image_bytes == 0 {
            return Err(ConfigError::Message(
                "Camera max_image_bytes must be greater than 0".to_string(),
            ));
        }

        if self.camera.fetch_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Camera fetch_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.roi.x1 <= self.roi.x || self.roi.y1 <= self.roi.y {
            return Err(ConfigError::Message(format!(
                "ROI must have a positive extent, got ({}, {}) -> ({}, {})",
                self.roi.x, self.roi.y, self.roi.x1, self.roi.y1
            )));
        }

        if self.sampling.interval_ms == 0 {
            return Err(ConfigError::Message(
                "Sampling interval_ms must be greater than 0".to_string(),
            ));
        }

        let input_len: usize = self.classifier.input_shape.iter().product();
        if self.classifier.input_shape.is_empty() || input_len != FEATURE_LEN {
            return Err(ConfigError::Message(format!(
                "Classifier input_shape {:?} must hold exactly {} values",
                self.classifier.input_shape, FEATURE_LEN
            )));
        }

        if self.door.debounce_threshold == 0 {
            return Err(ConfigError::Message(
                "Door debounce_threshold must be greater than 0".to_string(),
            ));
        }

        if self.door.travel_time_ms == 0 {
            return Err(ConfigError::Message(
                "Door travel_time_ms must be greater than 0".to_string(),
            ));
        }

        if self.door.control_tick_ms == 0 {
            return Err(ConfigError::Message(
                "Door control_tick_ms must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for GatecamConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                url: default_camera_url(),
                username: String::new(),
                password: String::new(),
                max_image_bytes: default_max_image_bytes(),
                fetch_timeout_ms: default_fetch_timeout_ms(),
            },
            roi: RoiConfig {
                x: default_roi_x(),
                y: default_roi_y(),
                x1: default_roi_x1(),
                y1: default_roi_y1(),
            },
            sampling: SamplingConfig {
                interval_ms: default_sampling_interval_ms(),
            },
            classifier: ClassifierConfig::default(),
            door: DoorConfig {
                relay_device: None,
                active_low: default_active_low(),
                pulse_ms: default_pulse_ms(),
                travel_time_ms: default_travel_time_ms(),
                debounce_threshold: default_debounce_threshold(),
                initial_state: default_initial_state(),
                control_tick_ms: default_control_tick_ms(),
            },
            api: ApiConfig {
                enabled: default_api_enabled(),
                ip: default_api_ip(),
                port: default_api_port(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
                debug_events: false,
            },
        }
    }
}

// Default value functions
fn default_camera_url() -> String {
    "http://192.168.1.64/ISAPI/Streaming/channels/101/picture".to_string()
}
fn default_max_image_bytes() -> usize {
    256 * 1024
}
fn default_fetch_timeout_ms() -> u64 {
    10_000
}

fn default_roi_x() -> u32 {
    230
}
fn default_roi_y() -> u32 {
    174
}
fn default_roi_x1() -> u32 {
    643
}
fn default_roi_y1() -> u32 {
    324
}

fn default_sampling_interval_ms() -> u64 {
    5_000
}

fn default_active_low() -> bool {
    true
}
fn default_pulse_ms() -> u64 {
    500
}
fn default_travel_time_ms() -> u64 {
    30_000
}
fn default_debounce_threshold() -> u32 {
    2
}
fn default_initial_state() -> DoorPosition {
    DoorPosition::Closed
}
fn default_control_tick_ms() -> u64 {
    250
}

fn default_api_enabled() -> bool {
    true
}
fn default_api_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_api_port() -> u16 {
    5001
}

fn default_input_shape() -> Vec<usize> {
    vec![1, 64, 64, 1]
}

fn default_event_bus_capacity() -> usize {
    100
}
