use super::grid::{AccumulationGrid, ROI_GRID_SIDE};
use crate::error::PipelineError;

/// Length of the classifier input vector
pub const FEATURE_LEN: usize = ROI_GRID_SIDE * ROI_GRID_SIDE;

/// Flattened, normalized ROI grid; every value lies in `[0, 1]`
#[derive(Debug, Clone)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    pub fn try_new() -> Result<Self, PipelineError> {
        let mut values = Vec::new();
        values
            .try_reserve_exact(FEATURE_LEN)
            .map_err(|e| PipelineError::BuffersUnavailable {
                details: format!("feature vector: {}", e),
            })?;
        values.resize(FEATURE_LEN, 0.0);
        Ok(Self { values })
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Aggregate over sampled cells, for logging only
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureSummary {
    pub total_sum: u64,
    pub sampled_cells: usize,
}

impl FeatureSummary {
    pub fn mean_gray(&self) -> Option<f32> {
        if self.sampled_cells == 0 {
            None
        } else {
            Some(self.total_sum as f32 / self.sampled_cells as f32)
        }
    }
}

pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Overwrite `out` with per-cell mean gray / 255; empty cells become 0.0
    pub fn build(grid: &AccumulationGrid, out: &mut FeatureVector) -> FeatureSummary {
        let mut summary = FeatureSummary::default();

        out.values.fill(0.0);
        for (value, cell) in out.values.iter_mut().zip(grid.cells()) {
            if let Some(mean) = cell.mean() {
                *value = mean as f32 / 255.0;
                summary.total_sum += mean as u64;
                summary.sampled_cells += 1;
            }
        }

        summary
    }
}
