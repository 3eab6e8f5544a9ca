mod accumulator;
mod decoder;
mod features;
mod grid;
mod pixel;
#[cfg(test)]
mod tests;

pub use accumulator::{AccumulationStats, FrameDimensions, Tile, TileAccumulator, TileSink};
pub use decoder::{JpegTileDecoder, TileDecoder, TILE_SIZE};
pub use features::{FeatureBuilder, FeatureSummary, FeatureVector, FEATURE_LEN};
pub use grid::{
    AccumulationGrid, FrameGrids, GridCell, Roi, DIAGNOSTIC_GRID_SIDE, ROI_GRID_SIDE,
};
pub use pixel::{expand_rgb565, luma, pack_rgb565, rgb565_to_gray};

#[cfg(test)]
pub(crate) use decoder::solid_jpeg;
