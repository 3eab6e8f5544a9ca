use super::engine::InferenceEngine;
use crate::error::ClassifierError;

use std::path::Path;
use tract_onnx::prelude::*;
use tracing::info;

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// ONNX model executed with tract.
///
/// The feature vector is reshaped to `input_shape` (NHWC `[1, 64, 64, 1]`
/// for the gate CNN) and the first output is flattened into the scores.
pub struct TractEngine {
    plan: Plan,
    input_shape: Vec<usize>,
    output_len: usize,
}

impl std::fmt::Debug for TractEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TractEngine")
            .field("input_shape", &self.input_shape)
            .field("output_len", &self.output_len)
            .finish()
    }
}

impl TractEngine {
    /// Load and optimise an ONNX model, then check it yields `output_len` scores
    pub fn load<P: AsRef<Path>>(
        path: P,
        input_shape: &[usize],
        output_len: usize,
    ) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        std::fs::metadata(path).map_err(|source| ClassifierError::ModelRead {
            path: display.clone(),
            source,
        })?;

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| {
                model.with_input_fact(
                    0,
                    InferenceFact::dt_shape(
                        f32::datum_type(),
                        input_shape.iter().copied().collect::<TVec<usize>>(),
                    ),
                )
            })
            .and_then(|model| model.into_optimized())
            .map_err(|e| ClassifierError::ModelLoad {
                path: display.clone(),
                details: format!("{:#}", e),
            })?;

        let engine = Self::from_typed(model, input_shape, output_len)?;
        let model_path = &display;
        info!(
            "Loaded ONNX classifier from {} (input {:?}, {} outputs)",
            model_path, engine.input_shape, engine.output_len
        );
        Ok(engine)
    }

    /// Wrap an already typed model
    pub fn from_typed(
        model: TypedModel,
        input_shape: &[usize],
        output_len: usize,
    ) -> Result<Self, ClassifierError> {
        if input_shape.is_empty() || input_shape.contains(&0) {
            return Err(ClassifierError::Topology {
                details: format!("degenerate input shape {:?}", input_shape),
            });
        }
        if output_len == 0 {
            return Err(ClassifierError::Topology {
                details: "model must produce at least one output".to_string(),
            });
        }

        let plan = model
            .into_runnable()
            .map_err(|e| ClassifierError::Topology {
                details: format!("{:#}", e),
            })?;

        let engine = Self {
            plan,
            input_shape: input_shape.to_vec(),
            output_len,
        };

        // A dry pass settles the real output width before the first frame
        let produced = engine.run(&vec![0.0; engine.input_len()])?;
        if produced.len() != output_len {
            return Err(ClassifierError::Topology {
                details: format!(
                    "model produces {} values, expected {}",
                    produced.len(),
                    output_len
                ),
            });
        }

        Ok(engine)
    }

    fn run(&self, input: &[f32]) -> Result<Vec<f32>, ClassifierError> {
        let tensor = tract_ndarray::ArrayD::from_shape_vec(
            tract_ndarray::IxDyn(&self.input_shape),
            input.to_vec(),
        )
        .map_err(|e| ClassifierError::Inference {
            details: e.to_string(),
        })?
        .into_tensor();

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| ClassifierError::Inference {
                details: format!("{:#}", e),
            })?;

        let output = outputs.first().ok_or_else(|| ClassifierError::Inference {
            details: "model produced no outputs".to_string(),
        })?;
        let scores = output
            .to_array_view::<f32>()
            .map_err(|e| ClassifierError::Inference {
                details: format!("output tensor was not f32: {}", e),
            })?;

        Ok(scores.iter().copied().collect())
    }
}

impl InferenceEngine for TractEngine {
    fn input_len(&self) -> usize {
        self.input_shape.iter().product()
    }

    fn output_len(&self) -> usize {
        self.output_len
    }

    fn predict(&self, input: &[f32], output: &mut [f32]) -> Result<(), ClassifierError> {
        if input.len() != self.input_len() {
            return Err(ClassifierError::InputSize {
                expected: self.input_len(),
                actual: input.len(),
            });
        }
        if output.len() != self.output_len {
            return Err(ClassifierError::OutputSize {
                expected: self.output_len,
                actual: output.len(),
            });
        }

        let scores = self.run(input)?;
        if scores.len() != self.output_len {
            return Err(ClassifierError::OutputSize {
                expected: self.output_len,
                actual: scores.len(),
            });
        }
        output.copy_from_slice(&scores);
        Ok(())
    }
}
