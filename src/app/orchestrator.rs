use super::types::{ComponentState, ShutdownReason};
use crate::classifier::{ClassifierAdapter, TractEngine, CLASS_COUNT};
use crate::config::{CameraConfig, GatecamConfig};
use crate::door::{Actuator, DoorController, LoggingRelay, SysfsRelay};
use crate::error::Result;
use crate::events::EventBus;
use crate::pipeline::{InferencePipeline, PipelineBuffers};
use crate::source::{FileImageSource, HttpImageSource, ImageSource};
use crate::vision::JpegTileDecoder;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const COMPONENT_DOOR: &str = "door";
pub const COMPONENT_PIPELINE: &str = "pipeline";
pub const COMPONENT_API: &str = "api";

/// Main application coordinator: owns the door, the sampling pipeline and
/// the HTTP surface
pub struct GateOrchestrator {
    pub(super) config: GatecamConfig,
    pub(super) event_bus: Arc<EventBus>,
    pub(super) door: DoorController,
    pub(super) pipeline: Option<InferencePipeline>,
    pub(super) api_task: Option<JoinHandle<()>>,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl GateOrchestrator {
    /// Create a new orchestrator with the given configuration
    pub async fn new(config: GatecamConfig) -> Result<Self> {
        let event_bus = Arc::new(if config.system.debug_events {
            EventBus::with_debug_logging(config.system.event_bus_capacity)
        } else {
            EventBus::new(config.system.event_bus_capacity)
        });
        let actuator = create_actuator(&config);
        let pipeline = create_pipeline(&config, &event_bus)?;

        Ok(Self::from_parts(config, event_bus, actuator, pipeline))
    }

    /// Assemble an orchestrator from already-built collaborators
    pub fn from_parts(
        config: GatecamConfig,
        event_bus: Arc<EventBus>,
        actuator: Arc<dyn Actuator>,
        pipeline: Option<InferencePipeline>,
    ) -> Self {
        let door = DoorController::new(&config.door, actuator, Arc::clone(&event_bus));
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        Self {
            config,
            event_bus,
            door,
            pipeline,
            api_task: None,
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn door(&self) -> DoorController {
        self.door.clone()
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    /// Whether camera inference is available (false means actuator-only)
    pub fn has_pipeline(&self) -> bool {
        self.pipeline.as_ref().is_some_and(InferencePipeline::is_enabled)
    }

    /// Token cancelled on shutdown; cancelling it also stops the control loop
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub async fn set_component_state(&self, component: &str, state: ComponentState) {
        let mut states = self.component_states.lock().await;
        states.insert(component.to_string(), state);
        debug!("Component '{}' state changed to: {:?}", component, state);
    }

    pub async fn get_component_state(&self, component: &str) -> Option<ComponentState> {
        let states = self.component_states.lock().await;
        states.get(component).copied()
    }

    pub async fn get_all_component_states(&self) -> HashMap<String, ComponentState> {
        let states = self.component_states.lock().await;
        states.clone()
    }
}

fn create_actuator(config: &GatecamConfig) -> Arc<dyn Actuator> {
    match &config.door.relay_device {
        Some(device) => Arc::new(SysfsRelay::new(device.clone(), config.door.active_low)),
        None => {
            warn!("No relay device configured; target writes will only be logged");
            Arc::new(LoggingRelay)
        }
    }
}

pub(super) fn create_source(config: &CameraConfig) -> Result<Box<dyn ImageSource>> {
    if let Some(path) = config.url.strip_prefix("file://") {
        return Ok(Box::new(FileImageSource::new(path, config.fetch_timeout())));
    }
    Ok(Box::new(HttpImageSource::new(config)?))
}

/// Build the sampling pipeline, or `None` for actuator-only operation
fn create_pipeline(
    config: &GatecamConfig,
    event_bus: &Arc<EventBus>,
) -> Result<Option<InferencePipeline>> {
    let Some(model_path) = config.classifier.model_path.as_deref() else {
        warn!("No classifier model configured; running actuator-only");
        return Ok(None);
    };

    let source = create_source(&config.camera)?;
    let engine = TractEngine::load(model_path, &config.classifier.input_shape, CLASS_COUNT)?;
    let classifier = ClassifierAdapter::new(Box::new(engine))?;

    let buffers = match PipelineBuffers::allocate(config.camera.max_image_bytes) {
        Ok(buffers) => buffers,
        Err(e) => {
            error!("{}; running actuator-only", e);
            return Ok(None);
        }
    };

    info!(
        "Sampling every {:?} from {}",
        config.sampling.interval(),
        source.describe()
    );

    Ok(Some(InferencePipeline::new(
        source,
        Box::new(JpegTileDecoder::new()),
        classifier,
        config.roi.to_roi(),
        buffers,
        Arc::clone(event_bus),
    )))
}
