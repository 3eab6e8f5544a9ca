use super::*;

fn uniform_tiles(
    sink: &mut dyn TileSink,
    frame: FrameDimensions,
    tile_size: u32,
    pixel: u16,
) {
    let buffer = vec![pixel; (tile_size * tile_size) as usize];
    for y in (0..frame.height).step_by(tile_size as usize) {
        for x in (0..frame.width).step_by(tile_size as usize) {
            let width = tile_size.min(frame.width - x);
            let height = tile_size.min(frame.height - y);
            sink.on_tile(&Tile {
                x,
                y,
                width,
                height,
                pixels: &buffer[..(width * height) as usize],
            });
        }
    }
}

#[test]
fn test_roi_counts_match_roi_area() {
    let frame = FrameDimensions::new(80, 48);
    let roi = Roi::new(8, 8, 72, 40);
    let mut grids = FrameGrids::try_new().unwrap();

    let mut accumulator = TileAccumulator::new(roi, &mut grids);
    accumulator.begin_frame(frame);
    uniform_tiles(&mut accumulator, frame, 16, pack_rgb565(90, 90, 90));
    let stats = accumulator.stats();

    assert_eq!(stats.roi_pixels, 64 * 32);
    assert_eq!(stats.pixels, 80 * 48);
    assert_eq!(grids.roi.total_count(), 64 * 32);
    assert_eq!(grids.diagnostic.total_count(), 80 * 48);
}

#[test]
fn test_tile_straddling_roi_boundary() {
    let frame = FrameDimensions::new(64, 64);
    let roi = Roi::new(8, 8, 64, 64);
    let mut grids = FrameGrids::try_new().unwrap();
    let pixels = vec![0xFFFFu16; 16 * 16];

    let mut accumulator = TileAccumulator::new(roi, &mut grids);
    accumulator.begin_frame(frame);
    accumulator.on_tile(&Tile {
        x: 0,
        y: 0,
        width: 16,
        height: 16,
        pixels: &pixels,
    });

    // Only the 8×8 lower-right quarter lies inside the ROI
    assert_eq!(grids.roi.total_count(), 64);
    // Every pixel still reaches the diagnostic grid
    assert_eq!(grids.diagnostic.total_count(), 256);
    // ROI origin maps to cell (0, 0)
    assert_eq!(grids.roi.cell(0, 0).unwrap().mean(), Some(255));
}

#[test]
fn test_roi_affine_mapping() {
    let frame = FrameDimensions::new(400, 200);
    let roi = Roi::new(100, 50, 228, 178);
    let mut grids = FrameGrids::try_new().unwrap();

    let mut accumulator = TileAccumulator::new(roi, &mut grids);
    accumulator.begin_frame(frame);
    // (227, 177) is the last ROI pixel: (127 * 64 / 128, 127 * 64 / 128) = (63, 63)
    for (x, y) in [(100, 50), (102, 50), (227, 177)] {
        accumulator.on_tile(&Tile {
            x,
            y,
            width: 1,
            height: 1,
            pixels: &[0xFFFF],
        });
    }

    assert_eq!(grids.roi.cell(0, 0).unwrap().count, 1);
    assert_eq!(grids.roi.cell(1, 0).unwrap().count, 1);
    assert_eq!(grids.roi.cell(63, 63).unwrap().count, 1);
    // Diagnostic: (227 * 16 / 400, 177 * 16 / 200) = (9, 14)
    assert_eq!(grids.diagnostic.cell(9, 14).unwrap().count, 1);
}

#[test]
fn test_tiles_before_dimensions_are_dropped() {
    let roi = Roi::new(0, 0, 32, 32);
    let mut grids = FrameGrids::try_new().unwrap();
    let pixels = vec![0xFFFFu16; 16 * 16];
    let tile = Tile {
        x: 0,
        y: 0,
        width: 16,
        height: 16,
        pixels: &pixels,
    };

    let mut accumulator = TileAccumulator::new(roi, &mut grids);
    accumulator.on_tile(&tile);
    accumulator.begin_frame(FrameDimensions::new(0, 0));
    accumulator.on_tile(&tile);
    assert!(accumulator.frame().is_none());
    assert_eq!(accumulator.stats().tiles_dropped, 2);

    assert_eq!(grids.roi.total_count(), 0);
    assert_eq!(grids.diagnostic.total_count(), 0);
}

#[test]
fn test_pixels_outside_frame_or_buffer_are_dropped() {
    let roi = Roi::new(0, 0, 10, 10);
    let mut grids = FrameGrids::try_new().unwrap();
    let full = vec![0xFFFFu16; 16 * 16];
    let short = vec![0xFFFFu16; 6];

    let mut accumulator = TileAccumulator::new(roi, &mut grids);
    accumulator.begin_frame(FrameDimensions::new(10, 10));
    accumulator.on_tile(&Tile {
        x: 0,
        y: 0,
        width: 16,
        height: 16,
        pixels: &full,
    });
    assert_eq!(accumulator.stats().pixels, 100);

    accumulator.on_tile(&Tile {
        x: 0,
        y: 0,
        width: 4,
        height: 4,
        pixels: &short,
    });
    assert_eq!(accumulator.stats().pixels, 106);

    assert_eq!(grids.diagnostic.total_count(), 106);
}

#[test]
fn test_accumulator_does_not_clear_grids() {
    let frame = FrameDimensions::new(32, 32);
    let roi = Roi::new(0, 0, 32, 32);
    let mut grids = FrameGrids::try_new().unwrap();

    for _ in 0..2 {
        let mut accumulator = TileAccumulator::new(roi, &mut grids);
        accumulator.begin_frame(frame);
        uniform_tiles(&mut accumulator, frame, 16, 0xFFFF);
    }
    assert_eq!(grids.roi.total_count(), 2 * 32 * 32);

    grids.clear();
    assert_eq!(grids.roi.total_count(), 0);
}

#[test]
fn test_synthetic_mid_gray_frame_end_to_end() {
    let frame = FrameDimensions::new(100, 100);
    let roi = Roi::new(0, 0, 100, 100);
    let pixel = pack_rgb565(128, 128, 128);
    let expected = rgb565_to_gray(pixel) as f32 / 255.0;
    let mut grids = FrameGrids::try_new().unwrap();
    let mut features = FeatureVector::try_new().unwrap();

    let mut accumulator = TileAccumulator::new(roi, &mut grids);
    accumulator.begin_frame(frame);
    uniform_tiles(&mut accumulator, frame, 16, pixel);

    let summary = FeatureBuilder::build(&grids.roi, &mut features);
    assert_eq!(summary.sampled_cells, FEATURE_LEN);
    assert!(features.as_slice().iter().all(|&v| v == expected));

    // 100 px over 16 cells: every cell sampled, 6 or 7 px per axis
    let cells = grids.diagnostic.cells();
    assert!(cells.iter().all(|c| c.count > 0));
    assert!(cells.iter().all(|c| [36, 42, 49].contains(&c.count)));
    assert_eq!(grids.diagnostic.total_count(), 100 * 100);
}

#[test]
fn test_evenly_divisible_frame_has_equal_diagnostic_counts() {
    let frame = FrameDimensions::new(128, 128);
    let roi = Roi::new(0, 0, 128, 128);
    let mut grids = FrameGrids::try_new().unwrap();

    let mut accumulator = TileAccumulator::new(roi, &mut grids);
    accumulator.begin_frame(frame);
    uniform_tiles(&mut accumulator, frame, 16, pack_rgb565(128, 128, 128));

    assert!(grids.diagnostic.cells().iter().all(|c| c.count == 64));
    assert!(grids.roi.cells().iter().all(|c| c.count == 4));
}

#[test]
fn test_jpeg_mid_gray_frame_end_to_end() {
    let jpeg = solid_jpeg(100, 100, [128, 128, 128]);
    let roi = Roi::new(0, 0, 100, 100);
    let mut decoder = JpegTileDecoder::new();
    let mut grids = FrameGrids::try_new().unwrap();
    let mut features = FeatureVector::try_new().unwrap();

    let dimensions = decoder.dimensions(&jpeg).unwrap();
    let mut accumulator = TileAccumulator::new(roi, &mut grids);
    accumulator.begin_frame(dimensions);
    decoder.decode(&jpeg, &mut accumulator).unwrap();

    FeatureBuilder::build(&grids.roi, &mut features);
    let first = features.as_slice()[0];
    assert!((first - 128.0 / 255.0).abs() < 0.03, "got {}", first);
    assert!(features
        .as_slice()
        .iter()
        .all(|&v| (v - first).abs() < 0.02));
    assert!(grids.diagnostic.cells().iter().all(|c| c.count > 0));
}
