// tests/test_convert.rs — Properties of the CPU luma reference through the
// public API.

use gpu_grayscale::convert::{luma, rgb_to_gray};
use gpu_grayscale::image::PixelBuffer;

fn gradient(width: u32, height: u32, channels: u8) -> PixelBuffer {
    let mut img = PixelBuffer::new(width, height, channels);
    for y in 0..height {
        for x in 0..width {
            let px = [
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                ((x + y) % 256) as u8,
                255,
            ];
            img.set_pixel(x, y, &px[..channels as usize]);
        }
    }
    img
}

#[test]
fn output_has_one_byte_per_pixel() {
    for (w, h) in [(1, 1), (3, 7), (64, 48), (101, 13)] {
        let gray = rgb_to_gray(&gradient(w, h, 3));
        assert_eq!(gray.as_slice().len(), (w * h) as usize, "{w}×{h}");
        assert_eq!((gray.width(), gray.height(), gray.channels()), (w, h, 1));
    }
}

#[test]
fn every_pixel_follows_the_formula() {
    let src = gradient(40, 30, 3);
    let gray = rgb_to_gray(&src);
    for y in 0..30 {
        for x in 0..40 {
            let p = src.pixel(x, y);
            let expected = (0.299f32 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32) as u8;
            assert_eq!(gray.pixel(x, y)[0], expected, "mismatch at ({x}, {y})");
        }
    }
}

#[test]
fn single_pixel_image() {
    let src = PixelBuffer::from_vec(1, 1, 3, vec![200, 100, 50]);
    let gray = rgb_to_gray(&src);
    assert_eq!(gray.as_slice(), &[luma(200, 100, 50)]);
    assert_eq!(gray.as_slice(), &[124]);
}

#[test]
fn conversion_is_deterministic() {
    let src = gradient(33, 21, 4);
    assert_eq!(rgb_to_gray(&src), rgb_to_gray(&src));
}

#[test]
fn white_and_black_are_fixed_points() {
    assert_eq!(luma(255, 255, 255), 255);
    assert_eq!(luma(0, 0, 0), 0);
}
