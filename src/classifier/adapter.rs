use super::engine::InferenceEngine;
use crate::door::DoorPosition;
use crate::error::ClassifierError;
use crate::vision::{FeatureVector, FEATURE_LEN};

use serde::Serialize;

/// Number of classifier outputs: `[closed, open]`
pub const CLASS_COUNT: usize = 2;

/// Raw two-class scores; not required to sum to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub prob_closed: f32,
    pub prob_open: f32,
}

impl Classification {
    pub fn new(prob_closed: f32, prob_open: f32) -> Self {
        Self {
            prob_closed,
            prob_open,
        }
    }

    /// Open only on a strictly greater open score; ties read as Closed
    pub fn label(&self) -> DoorPosition {
        if self.prob_open > self.prob_closed {
            DoorPosition::Open
        } else {
            DoorPosition::Closed
        }
    }
}

/// Runs one inference per call over a 4096-value feature vector
pub struct ClassifierAdapter {
    engine: Box<dyn InferenceEngine>,
}

impl ClassifierAdapter {
    pub fn new(engine: Box<dyn InferenceEngine>) -> Result<Self, ClassifierError> {
        if engine.input_len() != FEATURE_LEN {
            return Err(ClassifierError::InputSize {
                expected: FEATURE_LEN,
                actual: engine.input_len(),
            });
        }
        if engine.output_len() != CLASS_COUNT {
            return Err(ClassifierError::OutputSize {
                expected: CLASS_COUNT,
                actual: engine.output_len(),
            });
        }
        Ok(Self { engine })
    }

    pub fn classify(&self, features: &FeatureVector) -> Result<Classification, ClassifierError> {
        let mut scores = [0.0f32; CLASS_COUNT];
        self.engine.predict(features.as_slice(), &mut scores)?;
        Ok(Classification::new(scores[0], scores[1]))
    }
}
