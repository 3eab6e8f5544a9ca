use super::grid::{FrameGrids, Roi};
use super::pixel::rgb565_to_gray;
use tracing::{debug, trace};

/// Full decoded frame size, reported by the decoder before any tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
}

impl FrameDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Block of decoded RGB565 pixels at `(x, y)`, row-major, `width × height`
#[derive(Debug, Clone, Copy)]
pub struct Tile<'a> {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u16],
}

/// Consumer of decoded tiles, invoked synchronously by a decoder
pub trait TileSink {
    fn on_tile(&mut self, tile: &Tile<'_>);
}

/// Counters for one decode pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccumulationStats {
    pub tiles: u64,
    pub tiles_dropped: u64,
    pub pixels: u64,
    pub roi_pixels: u64,
}

/// Streams decoded tiles into the ROI and diagnostic grids.
///
/// Two-phase: `begin_frame` must report non-zero dimensions before tiles are
/// accumulated; until then every tile is dropped. Grids are borrowed and never
/// cleared here.
pub struct TileAccumulator<'g> {
    roi: Roi,
    frame: Option<FrameDimensions>,
    grids: &'g mut FrameGrids,
    stats: AccumulationStats,
}

impl<'g> TileAccumulator<'g> {
    pub fn new(roi: Roi, grids: &'g mut FrameGrids) -> Self {
        Self {
            roi,
            frame: None,
            grids,
            stats: AccumulationStats::default(),
        }
    }

    pub fn begin_frame(&mut self, dimensions: FrameDimensions) {
        if dimensions.is_empty() {
            debug!(
                "Ignoring empty frame dimensions {}x{}",
                dimensions.width, dimensions.height
            );
            self.frame = None;
        } else {
            self.frame = Some(dimensions);
        }
    }

    pub fn frame(&self) -> Option<FrameDimensions> {
        self.frame
    }

    pub fn stats(&self) -> AccumulationStats {
        self.stats
    }

    fn accumulate_pixel(&mut self, frame: FrameDimensions, abs_x: u32, abs_y: u32, pixel: u16) {
        if abs_x >= frame.width || abs_y >= frame.height {
            return;
        }

        let gray = rgb565_to_gray(pixel);
        self.stats.pixels += 1;

        if !self.roi.is_empty() && self.roi.contains(abs_x, abs_y) {
            let side = self.grids.roi.side() as u64;
            let tx = (abs_x - self.roi.x0) as u64 * side / self.roi.width() as u64;
            let ty = (abs_y - self.roi.y0) as u64 * side / self.roi.height() as u64;
            self.grids.roi.accumulate(tx as usize, ty as usize, gray);
            self.stats.roi_pixels += 1;
        }

        let side = self.grids.diagnostic.side() as u64;
        let wx = abs_x as u64 * side / frame.width as u64;
        let wy = abs_y as u64 * side / frame.height as u64;
        self.grids.diagnostic.accumulate(wx as usize, wy as usize, gray);
    }
}

impl TileSink for TileAccumulator<'_> {
    fn on_tile(&mut self, tile: &Tile<'_>) {
        let Some(frame) = self.frame else {
            self.stats.tiles_dropped += 1;
            trace!("Dropping tile at ({}, {}) before frame dimensions", tile.x, tile.y);
            return;
        };
        self.stats.tiles += 1;

        let width = tile.width as usize;
        for (j, row) in tile.pixels.chunks(width.max(1)).take(tile.height as usize).enumerate() {
            let abs_y = tile.y.saturating_add(j as u32);
            for (i, &pixel) in row.iter().take(width).enumerate() {
                let abs_x = tile.x.saturating_add(i as u32);
                self.accumulate_pixel(frame, abs_x, abs_y, pixel);
            }
        }
    }
}
