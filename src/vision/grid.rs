use crate::error::PipelineError;

/// Side length of the region-of-interest grid feeding the classifier
pub const ROI_GRID_SIDE: usize = 64;
/// Side length of the whole-frame diagnostic grid
pub const DIAGNOSTIC_GRID_SIDE: usize = 16;

/// Rectangular region of interest, `[x0, x1) × [y0, y1)` in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl Roi {
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// One accumulation cell: running gray sum and sample count.
///
/// `sum` is wide enough that it can never saturate before `count` does, so the
/// mean always stays within `0..=255`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridCell {
    pub sum: u64,
    pub count: u32,
}

impl GridCell {
    /// Integer mean gray value, if any sample landed here
    pub fn mean(&self) -> Option<u8> {
        if self.count == 0 {
            None
        } else {
            Some((self.sum / self.count as u64).min(u8::MAX as u64) as u8)
        }
    }
}

/// Square grid of accumulation cells, allocated once and cleared per frame
#[derive(Debug, Clone)]
pub struct AccumulationGrid {
    side: usize,
    cells: Vec<GridCell>,
}

impl AccumulationGrid {
    /// Allocate a `side × side` grid, reporting allocation failure instead of aborting
    pub fn try_new(side: usize) -> Result<Self, PipelineError> {
        let len = side * side;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|e| PipelineError::BuffersUnavailable {
                details: format!("{}x{} grid: {}", side, side, e),
            })?;
        cells.resize(len, GridCell::default());
        Ok(Self { side, cells })
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.fill(GridCell::default());
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<&GridCell> {
        if x < self.side && y < self.side {
            self.cells.get(y * self.side + x)
        } else {
            None
        }
    }

    /// Add one gray sample to cell `(x, y)`; coordinates are clamped to the grid
    pub fn accumulate(&mut self, x: usize, y: usize, gray: u8) {
        if self.side == 0 {
            return;
        }
        let x = x.min(self.side - 1);
        let y = y.min(self.side - 1);
        let cell = &mut self.cells[y * self.side + x];
        if cell.count == u32::MAX {
            return;
        }
        cell.sum += gray as u64;
        cell.count += 1;
    }

    pub fn total_count(&self) -> u64 {
        self.cells.iter().map(|c| c.count as u64).sum()
    }

    /// Mean gray per cell in row-major order, 0 for empty cells
    pub fn means(&self) -> Vec<u8> {
        self.cells.iter().map(|c| c.mean().unwrap_or(0)).collect()
    }
}

/// The two grids filled by one decode pass
#[derive(Debug, Clone)]
pub struct FrameGrids {
    pub roi: AccumulationGrid,
    pub diagnostic: AccumulationGrid,
}

impl FrameGrids {
    pub fn try_new() -> Result<Self, PipelineError> {
        Ok(Self {
            roi: AccumulationGrid::try_new(ROI_GRID_SIDE)?,
            diagnostic: AccumulationGrid::try_new(DIAGNOSTIC_GRID_SIDE)?,
        })
    }

    /// Reset both grids; must run before every decode pass
    pub fn clear(&mut self) {
        self.roi.clear();
        self.diagnostic.clear();
    }

    /// Whole-frame preview as rows of mean gray values, for debug logging
    pub fn diagnostic_preview(&self) -> String {
        let side = self.diagnostic.side();
        self.diagnostic
            .means()
            .chunks(side.max(1))
            .map(|row| {
                row.iter()
                    .map(|v| format!("{:3}", v))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
