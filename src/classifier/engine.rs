use crate::error::ClassifierError;

/// Vector-in/vector-out inference collaborator.
///
/// Implementations must be deterministic: identical input yields identical
/// output.
pub trait InferenceEngine: Send + Sync {
    fn input_len(&self) -> usize;

    fn output_len(&self) -> usize;

    /// Run one forward pass, writing `output_len()` values into `output`
    fn predict(&self, input: &[f32], output: &mut [f32]) -> Result<(), ClassifierError>;
}

/// Engine returning fixed scores, for tests and dry runs
#[derive(Debug, Clone)]
pub struct FixedEngine {
    input_len: usize,
    scores: [f32; 2],
}

impl FixedEngine {
    pub fn new(input_len: usize, prob_closed: f32, prob_open: f32) -> Self {
        Self {
            input_len,
            scores: [prob_closed, prob_open],
        }
    }
}

impl InferenceEngine for FixedEngine {
    fn input_len(&self) -> usize {
        self.input_len
    }

    fn output_len(&self) -> usize {
        self.scores.len()
    }

    fn predict(&self, input: &[f32], output: &mut [f32]) -> Result<(), ClassifierError> {
        if input.len() != self.input_len {
            return Err(ClassifierError::InputSize {
                expected: self.input_len,
                actual: input.len(),
            });
        }
        if output.len() != self.scores.len() {
            return Err(ClassifierError::OutputSize {
                expected: self.scores.len(),
                actual: output.len(),
            });
        }
        output.copy_from_slice(&self.scores);
        Ok(())
    }
}
