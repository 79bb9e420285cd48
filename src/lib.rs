// gpu-grayscale: decode an image, convert it to luminance with one wgpu
// compute dispatch, write the result as a JPEG.
//
//   image     — host pixel buffer (interleaved u8 channels)
//   convert   — CPU reference of the luma formula
//   io        — decode / directory / JPEG encode
//   gpu       — device, kernel, device buffers
//   config    — pipeline configuration and fixed defaults
//   pipeline  — GrayscaleConverter, the end-to-end run
//   error     — one error variant per pipeline step

pub mod config;
pub mod convert;
pub mod error;
pub mod gpu;
pub mod image;
pub mod io;
pub mod pipeline;

pub use config::PipelineConfig;
pub use error::{GrayscaleError, Result};
pub use pipeline::{ConversionReport, GrayscaleConverter};
