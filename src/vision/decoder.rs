use super::accumulator::{FrameDimensions, Tile, TileSink};
use super::pixel::pack_rgb565;
use crate::error::DecodeError;

use image::io::Reader as ImageReader;
use image::ImageFormat;
use std::io::Cursor;
use tracing::debug;

/// Edge length of the tiles handed to the sink (one 4:2:0 JPEG MCU)
pub const TILE_SIZE: u32 = 16;

/// Decoder collaborator: reports dimensions, then streams tiles into a sink
pub trait TileDecoder: Send {
    fn dimensions(&self, jpeg: &[u8]) -> Result<FrameDimensions, DecodeError>;

    /// Invoke `sink.on_tile` for every tile of the image, in raster order
    fn decode(&mut self, jpeg: &[u8], sink: &mut dyn TileSink) -> Result<(), DecodeError>;
}

/// JPEG decoder delivering RGB565 tiles
pub struct JpegTileDecoder {
    tile: Vec<u16>,
}

impl JpegTileDecoder {
    pub fn new() -> Self {
        Self {
            tile: Vec::with_capacity((TILE_SIZE * TILE_SIZE) as usize),
        }
    }
}

impl Default for JpegTileDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TileDecoder for JpegTileDecoder {
    fn dimensions(&self, jpeg: &[u8]) -> Result<FrameDimensions, DecodeError> {
        let (width, height) = ImageReader::with_format(Cursor::new(jpeg), ImageFormat::Jpeg)
            .into_dimensions()
            .map_err(|e| DecodeError::Dimensions {
                details: e.to_string(),
            })?;

        if width == 0 || height == 0 {
            return Err(DecodeError::Dimensions {
                details: format!("empty frame {}x{}", width, height),
            });
        }

        Ok(FrameDimensions::new(width, height))
    }

    fn decode(&mut self, jpeg: &[u8], sink: &mut dyn TileSink) -> Result<(), DecodeError> {
        let image = image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg)
            .map_err(|e| DecodeError::Draw {
                details: e.to_string(),
            })?
            .to_rgb8();

        let (width, height) = image.dimensions();
        debug!("Decoded JPEG {}x{}, streaming tiles", width, height);

        for tile_y in (0..height).step_by(TILE_SIZE as usize) {
            let tile_height = TILE_SIZE.min(height - tile_y);
            for tile_x in (0..width).step_by(TILE_SIZE as usize) {
                let tile_width = TILE_SIZE.min(width - tile_x);

                self.tile.clear();
                for y in tile_y..tile_y + tile_height {
                    for x in tile_x..tile_x + tile_width {
                        let rgb = image.get_pixel(x, y);
                        self.tile.push(pack_rgb565(rgb[0], rgb[1], rgb[2]));
                    }
                }

                sink.on_tile(&Tile {
                    x: tile_x,
                    y: tile_y,
                    width: tile_width,
                    height: tile_height,
                    pixels: &self.tile,
                });
            }
        }

        Ok(())
    }
}

/// Encode a solid-colour JPEG for tests
#[cfg(test)]
pub(crate) fn solid_jpeg(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    use image::codecs::jpeg::JpegEncoder;

    let data: Vec<u8> = rgb
        .iter()
        .copied()
        .cycle()
        .take((width * height * 3) as usize)
        .collect();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, 95)
        .encode(&data, width, height, image::ColorType::Rgb8)
        .unwrap();
    jpeg
}
