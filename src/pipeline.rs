use crate::classifier::{Classification, ClassifierAdapter};
use crate::door::DoorPosition;
use crate::error::{GatecamError, PipelineError, Result};
use crate::events::{EventBus, GateEvent};
use crate::frame::RawFrame;
use crate::source::ImageSource;
use crate::vision::{
    FeatureBuilder, FeatureVector, FrameDimensions, FrameGrids, Roi, TileAccumulator, TileDecoder,
};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, error, info, trace, warn};

/// Working memory for one sampling cycle, allocated once at startup
pub struct PipelineBuffers {
    pub frame: RawFrame,
    pub grids: FrameGrids,
    pub features: FeatureVector,
}

impl PipelineBuffers {
    /// Allocate every buffer up front; any failure leaves the pipeline unavailable
    pub fn allocate(max_image_bytes: usize) -> std::result::Result<Self, PipelineError> {
        Ok(Self {
            frame: RawFrame::try_with_capacity(max_image_bytes)?,
            grids: FrameGrids::try_new()?,
            features: FeatureVector::try_new()?,
        })
    }
}

/// Result of a classified frame
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub width: u32,
    pub height: u32,
    pub image_bytes: usize,
    pub classification: Classification,
    pub label: DoorPosition,
    pub sampled_cells: usize,
    pub mean_gray: Option<f32>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Classified(CycleReport),
    /// Frame decoded but no pixel fell inside the ROI; inference skipped
    NoSamples { width: u32, height: u32 },
}

impl CycleOutcome {
    pub fn label(&self) -> Option<DoorPosition> {
        match self {
            CycleOutcome::Classified(report) => Some(report.label),
            CycleOutcome::NoSamples { .. } => None,
        }
    }
}

/// Counters over the lifetime of the pipeline
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleStats {
    pub cycles: u64,
    pub classified: u64,
    pub no_samples: u64,
    pub retrieval_failures: u64,
    pub decode_failures: u64,
    pub classifier_failures: u64,
    pub other_failures: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl CycleStats {
    pub fn failures(&self) -> u64 {
        self.retrieval_failures
            + self.decode_failures
            + self.classifier_failures
            + self.other_failures
    }
}

/// Shared view of the pipeline for the status endpoints
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStatus {
    pub enabled: bool,
    pub source: String,
    pub last_report: Option<CycleReport>,
    pub stats: CycleStats,
}

/// Retrieval → decode → features → classification, one cycle per call
pub struct InferencePipeline {
    source: Box<dyn ImageSource>,
    decoder: Box<dyn TileDecoder>,
    classifier: ClassifierAdapter,
    roi: Roi,
    frame: Option<RawFrame>,
    grids: FrameGrids,
    features: FeatureVector,
    status: Arc<Mutex<PipelineStatus>>,
    event_bus: Arc<EventBus>,
}

impl InferencePipeline {
    pub fn new(
        source: Box<dyn ImageSource>,
        decoder: Box<dyn TileDecoder>,
        classifier: ClassifierAdapter,
        roi: Roi,
        buffers: PipelineBuffers,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let status = PipelineStatus {
            enabled: true,
            source: source.describe(),
            ..PipelineStatus::default()
        };

        info!(
            "Inference pipeline ready: source {}, ROI ({}, {}) -> ({}, {})",
            status.source, roi.x0, roi.y0, roi.x1, roi.y1
        );

        Self {
            source,
            decoder,
            classifier,
            roi,
            frame: Some(buffers.frame),
            grids: buffers.grids,
            features: buffers.features,
            status: Arc::new(Mutex::new(status)),
            event_bus,
        }
    }

    pub fn status_handle(&self) -> Arc<Mutex<PipelineStatus>> {
        Arc::clone(&self.status)
    }

    /// False once the frame buffer has been lost
    pub fn is_enabled(&self) -> bool {
        self.frame.is_some()
    }

    pub fn stats(&self) -> CycleStats {
        self.status.lock().stats.clone()
    }

    /// Run one sampling cycle.
    ///
    /// Any error aborts the cycle and is reported; the caller must leave door
    /// state untouched in that case.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let result = self.cycle().await;
        self.record(&result);
        result
    }

    async fn cycle(&mut self) -> Result<CycleOutcome> {
        let frame = self.frame.take().ok_or(PipelineError::Disabled)?;

        let fetched = match self.source.fetch(frame).await {
            Ok(fetched) => fetched,
            Err(e) => {
                error!("Frame buffer lost, disabling inference: {}", e);
                self.status.lock().enabled = false;
                return Err(e.into());
            }
        };
        self.frame = Some(fetched.frame);
        fetched.outcome?;

        self.analyze()
    }

    fn analyze(&mut self) -> Result<CycleOutcome> {
        let Self {
            decoder,
            classifier,
            roi,
            frame,
            grids,
            features,
            ..
        } = self;
        let frame = frame.as_ref().ok_or(PipelineError::Disabled)?;
        let jpeg = frame.as_bytes();

        grids.clear();
        let dimensions = decoder.dimensions(jpeg)?;
        let FrameDimensions { width, height } = dimensions;

        let accumulated = {
            let mut accumulator = TileAccumulator::new(*roi, grids);
            accumulator.begin_frame(dimensions);
            decoder.decode(jpeg, &mut accumulator)?;
            accumulator.stats()
        };
        debug!(
            "Decoded {}x{} frame: {} tiles, {} pixels, {} in ROI",
            width, height, accumulated.tiles, accumulated.pixels, accumulated.roi_pixels
        );
        trace!("Diagnostic grid:\n{}", grids.diagnostic_preview());

        let summary = FeatureBuilder::build(&grids.roi, features);
        if summary.sampled_cells == 0 {
            warn!("{}x{} frame has no pixels inside the ROI, skipping inference", width, height);
            return Ok(CycleOutcome::NoSamples { width, height });
        }

        let classification = classifier.classify(features)?;
        let label = classification.label();
        info!(
            "{}x{} Gate is {} (Scores: {:.3}, {:.3}) Avg: {:.1}",
            width,
            height,
            label,
            classification.prob_closed,
            classification.prob_open,
            summary.mean_gray().unwrap_or(0.0)
        );

        Ok(CycleOutcome::Classified(CycleReport {
            width,
            height,
            image_bytes: frame.len(),
            classification,
            label,
            sampled_cells: summary.sampled_cells,
            mean_gray: summary.mean_gray(),
            completed_at: Utc::now(),
        }))
    }

    fn record(&self, result: &Result<CycleOutcome>) {
        let event = {
            let mut guard = self.status.lock();
            let status = &mut *guard;
            let stats = &mut status.stats;
            stats.cycles += 1;

            match result {
                Ok(CycleOutcome::Classified(report)) => {
                    stats.classified += 1;
                    stats.last_success = Some(report.completed_at);
                    status.last_report = Some(report.clone());
                    Some(GateEvent::FrameClassified {
                        label: report.label,
                        prob_closed: report.classification.prob_closed,
                        prob_open: report.classification.prob_open,
                        timestamp: SystemTime::now(),
                    })
                }
                Ok(CycleOutcome::NoSamples { .. }) => {
                    stats.no_samples += 1;
                    None
                }
                Err(e) => {
                    let stage = match e {
                        GatecamError::Retrieval(_) => {
                            stats.retrieval_failures += 1;
                            "retrieval"
                        }
                        GatecamError::Decode(_) => {
                            stats.decode_failures += 1;
                            "decode"
                        }
                        GatecamError::Classifier(_) => {
                            stats.classifier_failures += 1;
                            "classifier"
                        }
                        _ => {
                            stats.other_failures += 1;
                            "pipeline"
                        }
                    };
                    stats.last_failure = Some(Utc::now());
                    stats.last_error = Some(e.to_string());
                    warn!("Sampling cycle aborted during {}: {}", stage, e);
                    Some(GateEvent::CycleFailed {
                        stage: stage.to_string(),
                        error: e.to_string(),
                    })
                }
            }
        };

        if let Some(event) = event {
            if let Err(e) = self.event_bus.publish(event) {
                debug!("Pipeline event not delivered: {}", e);
            }
        }
    }
}
