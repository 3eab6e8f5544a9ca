use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatecamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Actuator error: {0}")]
    Actuator(#[from] ActuatorError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[cfg(feature = "api")]
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

/// Camera image retrieval failures
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Invalid camera URL '{url}': {details}")]
    InvalidUrl { url: String, details: String },

    #[error("GET failed with status {status}")]
    Status { status: u16 },

    #[error("Transport failure: {details}")]
    Transport { details: String },

    #[error("Response carries no usable Content-Length")]
    MissingLength,

    #[error("Image too large ({length} > {capacity})")]
    TooLarge { length: usize, capacity: usize },

    #[error("Stream incomplete ({received}/{expected})")]
    Incomplete { received: usize, expected: usize },

    #[error("Image source I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// JPEG decoding failures
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Size failed: {details}")]
    Dimensions { details: String },

    #[error("Draw failed: {details}")]
    Draw { details: String },
}

/// Inference engine and model loading failures
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Failed to read model file {path}: {source}")]
    ModelRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load model {path}: {details}")]
    ModelLoad { path: String, details: String },

    #[error("Invalid model topology: {details}")]
    Topology { details: String },

    #[error("Invalid input size: expected {expected}, got {actual}")]
    InputSize { expected: usize, actual: usize },

    #[error("Invalid output size: expected {expected}, got {actual}")]
    OutputSize { expected: usize, actual: usize },

    #[error("Inference failed: {details}")]
    Inference { details: String },
}

/// Sampling pipeline failures that are not attributable to a single collaborator
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Pipeline buffers unavailable: {details}")]
    BuffersUnavailable { details: String },

    #[error("Inference pipeline disabled")]
    Disabled,

    #[error("Blocking task failed: {details}")]
    Task { details: String },
}

/// Relay actuator failures
#[derive(Error, Debug)]
pub enum ActuatorError {
    #[error("Failed to drive relay {device}: {source}")]
    Write {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid target state code: {code}")]
    InvalidTarget { code: u8 },

    #[error("Relay pulse task failed: {details}")]
    Task { details: String },
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },
}

#[cfg(feature = "api")]
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to bind to {address}: {source}")]
    BindFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server failed: {details}")]
    ServerFailed { details: String },
}

impl GatecamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatecamError>;
