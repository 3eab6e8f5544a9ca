pub mod app;
pub mod classifier;
pub mod config;
pub mod door;
pub mod error;
pub mod events;
pub mod frame;
pub mod pipeline;
pub mod source;
pub mod vision;

#[cfg(feature = "api")]
pub mod api;

pub use app::{ComponentState, GateOrchestrator, ShutdownReason};
pub use classifier::{Classification, ClassifierAdapter, InferenceEngine, TractEngine};
pub use config::GatecamConfig;
pub use door::{
    Actuator, DebounceReconciler, DebounceVote, DoorController, DoorPosition, DoorState,
    DoorStateMachine, TargetOutcome,
};
pub use error::{GatecamError, Result};
pub use events::{EventBus, GateEvent, TransitionCause};
pub use frame::RawFrame;
pub use pipeline::{CycleOutcome, CycleReport, CycleStats, InferencePipeline, PipelineBuffers};
pub use source::{FileImageSource, HttpImageSource, ImageSource};
pub use vision::{
    FeatureBuilder, FeatureVector, FrameGrids, JpegTileDecoder, Roi, Tile, TileAccumulator,
    TileDecoder, TileSink,
};

#[cfg(feature = "api")]
pub use api::{ApiServer, ApiState};
