// tests/test_pipeline.rs — End-to-end behaviour of the converter and binary.
//
// The binary takes no arguments and reads its input relative to the working
// directory, so it is run inside an empty temp dir here.

use std::path::Path;
use std::process::Command;

use gpu_grayscale::config::{DEFAULT_INPUT, DEFAULT_OUTPUT};
use gpu_grayscale::{GrayscaleConverter, GrayscaleError, PipelineConfig};

fn write_rgb_png(path: &Path, width: u32, height: u32) {
    let data: Vec<u8> = (0..width * height * 3).map(|i| (i * 37 % 256) as u8).collect();
    image::RgbImage::from_raw(width, height, data).unwrap().save(path).unwrap();
}

#[test]
fn binary_exits_one_without_input() {
    let dir = tempfile::tempdir().unwrap();
    let status = Command::new(env!("CARGO_BIN_EXE_gpu-grayscale"))
        .current_dir(dir.path())
        .env("RUST_LOG", "off")
        .status()
        .expect("failed to run binary");
    assert_eq!(status.code(), Some(1));
    assert!(!dir.path().join(DEFAULT_OUTPUT).exists());
    assert!(!dir.path().join("output").exists());
}

#[test]
fn missing_input_is_an_image_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.jpg");
    let conv = GrayscaleConverter::new(PipelineConfig::with_paths(dir.path().join(DEFAULT_INPUT), &out))
        .unwrap();
    let err = conv.run().unwrap_err();
    assert!(matches!(err, GrayscaleError::ImageLoad { .. }), "got {err}");
    assert!(!out.exists());
}

#[test]
#[ignore = "requires a real GPU"]
fn converts_png_to_gray_jpeg() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    write_rgb_png(&input, 45, 31);
    let out = dir.path().join("nested/dir/out.jpg");

    let report = GrayscaleConverter::new(PipelineConfig::with_paths(&input, &out))
        .unwrap()
        .run()
        .expect("conversion should succeed");
    assert_eq!((report.width, report.height, report.channels), (45, 31, 3));
    assert_eq!(report.output, out);

    let written = image::open(&out).unwrap();
    assert_eq!(written.color(), image::ColorType::L8);
    assert_eq!((written.width(), written.height()), (45, 31));
}
