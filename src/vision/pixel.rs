//! RGB565 pixel helpers.
//!
//! Luma weights are applied in fixed point (per mille) so that equal
//! expanded channels reproduce the same gray value exactly.

const RED_WEIGHT: u32 = 299;
const GREEN_WEIGHT: u32 = 587;
const BLUE_WEIGHT: u32 = 114;
const WEIGHT_SCALE: u32 = RED_WEIGHT + GREEN_WEIGHT + BLUE_WEIGHT;

/// Expand the three RGB565 channels to 8-bit range
pub fn expand_rgb565(pixel: u16) -> (u8, u8, u8) {
    let r = ((pixel >> 11) & 0x1F) as u32;
    let g = ((pixel >> 5) & 0x3F) as u32;
    let b = (pixel & 0x1F) as u32;

    (
        (r * 255 / 31) as u8,
        (g * 255 / 63) as u8,
        (b * 255 / 31) as u8,
    )
}

/// Luma-weighted grayscale of 8-bit channels (0.299 R + 0.587 G + 0.114 B)
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted =
        r as u32 * RED_WEIGHT + g as u32 * GREEN_WEIGHT + b as u32 * BLUE_WEIGHT;
    (weighted / WEIGHT_SCALE) as u8
}

pub fn rgb565_to_gray(pixel: u16) -> u8 {
    let (r, g, b) = expand_rgb565(pixel);
    luma(r, g, b)
}

/// Pack 8-bit channels into RGB565
pub fn pack_rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_channels_round_trip() {
        for value in 0..=255u8 {
            assert_eq!(luma(value, value, value), value);
        }
    }

    #[test]
    fn test_extremes() {
        assert_eq!(rgb565_to_gray(0x0000), 0);
        assert_eq!(rgb565_to_gray(0xFFFF), 255);
        assert_eq!(expand_rgb565(0xFFFF), (255, 255, 255));
    }

    #[test]
    fn test_packed_gray_stays_close() {
        for value in 0..=255u8 {
            let gray = rgb565_to_gray(pack_rgb565(value, value, value));
            assert!(
                (gray as i16 - value as i16).abs() <= 8,
                "value {} came back as {}",
                value,
                gray
            );
        }
    }

    #[test]
    fn test_channel_weights() {
        // Pure green dominates, pure blue contributes least
        let red = rgb565_to_gray(pack_rgb565(255, 0, 0));
        let green = rgb565_to_gray(pack_rgb565(0, 255, 0));
        let blue = rgb565_to_gray(pack_rgb565(0, 0, 255));
        assert_eq!(red, 76);
        assert_eq!(green, 149);
        assert_eq!(blue, 29);
    }
}
