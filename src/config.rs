// config.rs — Pipeline configuration.
//
// There is no configuration surface: the binary always runs with
// `PipelineConfig::default()`. The struct exists so tests and library
// callers can point the pipeline at other files.

use std::path::PathBuf;

use crate::error::{GrayscaleError, Result};
use crate::gpu::device::DeviceProfile;

/// Image read when no other input is configured.
pub const DEFAULT_INPUT: &str = "ISIC_0178428.jpg";

/// Where the grayscale JPEG is written. The parent directory is created.
pub const DEFAULT_OUTPUT: &str = "output/output.jpg";

/// JPEG quality of the output.
pub const DEFAULT_JPEG_QUALITY: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    /// 1..=100
    pub jpeg_quality: u8,
    pub profile: DeviceProfile,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            profile: DeviceProfile::Native,
        }
    }
}

impl PipelineConfig {
    /// Same defaults, different files.
    pub fn with_paths(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        PipelineConfig {
            input: input.into(),
            output: output.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(GrayscaleError::Config(format!(
                "jpeg_quality must be 1..=100 (got {})",
                self.jpeg_quality
            )));
        }
        if self.output.file_name().is_none() {
            return Err(GrayscaleError::Config(format!(
                "output path {} has no file name",
                self.output.display()
            )));
        }
        Ok(())
    }
}
