// io.rs — Image decode/encode at the edges of the pipeline.
//
//   load_rgb           file → interleaved RGB or RGBA buffer
//   ensure_parent_dir  create the directory that will hold the output
//   save_gray_jpeg     luminance buffer → single-channel JPEG

use std::fs;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::error::{GrayscaleError, Result};
use crate::image::PixelBuffer;

/// Decode an image file into 3-channel RGB, or 4-channel RGBA when the
/// source carries alpha. Grayscale sources are expanded to RGB.
pub fn load_rgb(path: &Path) -> Result<PixelBuffer> {
    let img = image::open(path).map_err(|source| GrayscaleError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;

    let (width, height) = (img.width(), img.height());
    let buffer = if img.color().has_alpha() {
        PixelBuffer::from_vec(width, height, 4, img.into_rgba8().into_raw())
    } else {
        PixelBuffer::from_vec(width, height, 3, img.into_rgb8().into_raw())
    };
    tracing::debug!(path = %path.display(), shape = %buffer, "decoded image");
    Ok(buffer)
}

/// Create the parent directory of `path` if it does not exist yet.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|source| GrayscaleError::Directory {
                path: dir.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

/// Encode a single-channel buffer as JPEG at `quality` (1..=100) and write
/// it to `path`. The JPEG is built in memory first, so a failed encode
/// never leaves a partial file behind.
pub fn save_gray_jpeg(path: &Path, gray: &PixelBuffer, quality: u8) -> Result<()> {
    let encode_err = |reason: String| GrayscaleError::Encode {
        path: path.to_path_buf(),
        reason,
    };
    if gray.channels() != 1 {
        return Err(encode_err(format!(
            "expected a single-channel buffer, got {} channels",
            gray.channels()
        )));
    }

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .encode(gray.as_slice(), gray.width(), gray.height(), ExtendedColorType::L8)
        .map_err(|e| encode_err(e.to_string()))?;

    fs::write(path, &jpeg).map_err(|e| encode_err(e.to_string()))?;
    tracing::debug!(path = %path.display(), bytes = jpeg.len(), "wrote jpeg");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ColorType;

    #[test]
    fn test_load_missing_file() {
        let err = load_rgb(Path::new("definitely/not/here.jpg")).unwrap_err();
        assert!(matches!(err, GrayscaleError::ImageLoad { .. }));
    }

    #[test]
    fn test_load_not_an_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.jpg");
        fs::write(&path, b"this is not a jpeg").unwrap();
        let err = load_rgb(&path).unwrap_err();
        assert!(matches!(err, GrayscaleError::ImageLoad { .. }));
    }

    #[test]
    fn test_load_png_rgb_and_rgba() {
        let dir = tempfile::tempdir().unwrap();

        let rgb_path = dir.path().join("rgb.png");
        image::RgbImage::from_raw(2, 1, vec![255, 0, 0, 0, 0, 255])
            .unwrap()
            .save(&rgb_path)
            .unwrap();
        let rgb = load_rgb(&rgb_path).unwrap();
        assert_eq!(rgb.channels(), 3);
        assert_eq!(rgb.as_slice(), &[255, 0, 0, 0, 0, 255]);

        let rgba_path = dir.path().join("rgba.png");
        image::RgbaImage::from_raw(1, 1, vec![1, 2, 3, 4])
            .unwrap()
            .save(&rgba_path)
            .unwrap();
        let rgba = load_rgb(&rgba_path).unwrap();
        assert_eq!(rgba.channels(), 4);
        assert_eq!(rgba.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_load_gray_source_expands_to_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        image::GrayImage::from_raw(1, 1, vec![77]).unwrap().save(&path).unwrap();
        let img = load_rgb(&path).unwrap();
        assert_eq!(img.channels(), 3);
        assert_eq!(img.as_slice(), &[77, 77, 77]);
    }

    #[test]
    fn test_ensure_parent_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a/b/out.jpg");
        ensure_parent_dir(&out).unwrap();
        assert!(dir.path().join("a/b").is_dir());
        // Bare file name: nothing to create.
        ensure_parent_dir(Path::new("out.jpg")).unwrap();
    }

    #[test]
    fn test_ensure_parent_dir_blocked_by_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();
        let err = ensure_parent_dir(&blocker.join("out.jpg")).unwrap_err();
        assert!(matches!(err, GrayscaleError::Directory { .. }));
    }

    #[test]
    fn test_save_gray_jpeg_decodes_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.jpg");
        let gray = PixelBuffer::from_vec(8, 8, 1, vec![128; 64]);
        save_gray_jpeg(&path, &gray, 100).unwrap();

        let back = image::open(&path).unwrap();
        assert_eq!(back.color(), ColorType::L8);
        let back = back.into_luma8();
        assert_eq!(back.dimensions(), (8, 8));
        // A flat block survives JPEG at quality 100 within a level or two.
        assert!(back.pixels().all(|p| (p.0[0] as i32 - 128).abs() <= 2));
    }

    #[test]
    fn test_save_rejects_multichannel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.jpg");
        let err = save_gray_jpeg(&path, &PixelBuffer::new(2, 2, 3), 100).unwrap_err();
        assert!(matches!(err, GrayscaleError::Encode { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_save_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing/out.jpg");
        let err = save_gray_jpeg(&path, &PixelBuffer::new(2, 2, 1), 100).unwrap_err();
        assert!(matches!(err, GrayscaleError::Encode { .. }));
    }
}
