// convert.rs — CPU reference for the RGB → luminance conversion.
//
// This is the authoritative definition of the formula. The GPU kernel in
// shaders/rgb_to_gray.wgsl mirrors it and is validated against it
// pixel-for-pixel (modulo ±1 where a driver fuses the multiply-adds).
//
// Uses ITU-R BT.601 luma coefficients in f32:
//   Y = 0.299*R + 0.587*G + 0.114*B
// then truncates to u8, exactly as the kernel's `u32(value)` does. No
// rounding: 151.38 becomes 151, not 152.

use crate::image::PixelBuffer;

pub const LUMA_R: f32 = 0.299;
pub const LUMA_G: f32 = 0.587;
pub const LUMA_B: f32 = 0.114;

/// Luminance of one RGB triple, truncated to u8.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = LUMA_R * r as f32 + LUMA_G * g as f32 + LUMA_B * b as f32;
    // Coefficients sum to 1.0, so y never exceeds 255.0 by more than an ulp.
    y.min(255.0) as u8
}

/// Convert an RGB or RGBA buffer to a single-channel luminance buffer.
/// Alpha, when present, is ignored.
///
/// # Panics
/// If `src` has fewer than 3 channels.
pub fn rgb_to_gray(src: &PixelBuffer) -> PixelBuffer {
    let channels = src.channels() as usize;
    assert!(channels >= 3, "rgb_to_gray needs 3 or 4 channels (got {channels})");

    let gray: Vec<u8> = src
        .as_slice()
        .chunks_exact(channels)
        .map(|px| luma(px[0], px[1], px[2]))
        .collect();
    PixelBuffer::from_vec(src.width(), src.height(), 1, gray)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luma_primaries() {
        assert_eq!(luma(255, 0, 0), 76);  // 76.245
        assert_eq!(luma(0, 255, 0), 149); // 149.685
        assert_eq!(luma(0, 0, 255), 29);  // 29.07
    }

    #[test]
    fn test_luma_truncates() {
        assert_eq!(luma(255, 128, 0), 151); // 151.381
        assert_eq!(luma(30, 60, 90), 54);   // 54.45
        assert_eq!(luma(200, 100, 50), 124);
    }

    #[test]
    fn test_luma_neutral_gray_within_one_level() {
        // The f32 coefficients sum to just under 1.0 for some levels.
        for v in 0..=255u8 {
            let y = luma(v, v, v);
            assert!(v.saturating_sub(1) <= y && y <= v, "gray level {v} -> {y}");
        }
        assert_eq!(luma(37, 37, 37), 36);
        assert_eq!(luma(128, 128, 128), 128);
        assert_eq!(luma(255, 255, 255), 255);
    }

    #[test]
    fn test_rgb_to_gray_output_size() {
        let src = PixelBuffer::new(7, 5, 3);
        let gray = rgb_to_gray(&src);
        assert_eq!(gray.channels(), 1);
        assert_eq!(gray.as_slice().len(), 7 * 5);
    }

    #[test]
    fn test_rgb_to_gray_single_pixel() {
        let src = PixelBuffer::from_vec(1, 1, 3, vec![10, 20, 30]);
        let gray = rgb_to_gray(&src);
        assert_eq!(gray.as_slice(), &[18]);
    }

    #[test]
    fn test_rgba_ignores_alpha() {
        let rgb = PixelBuffer::from_vec(2, 1, 3, vec![255, 0, 0, 0, 0, 255]);
        let rgba = PixelBuffer::from_vec(2, 1, 4, vec![255, 0, 0, 7, 0, 0, 255, 200]);
        assert_eq!(rgb_to_gray(&rgb).as_slice(), rgb_to_gray(&rgba).as_slice());
    }

    #[test]
    #[should_panic(expected = "3 or 4 channels")]
    fn test_rejects_single_channel() {
        rgb_to_gray(&PixelBuffer::new(2, 2, 1));
    }
}
