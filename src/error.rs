// error.rs — Error taxonomy for the grayscale pipeline.
//
// One variant per pipeline step. Nothing is retried: the first error ends
// the run and the binary maps it to exit status 1.

use std::path::PathBuf;

use thiserror::Error;

use crate::gpu::kernel::BuildLog;

/// Every way a conversion run can fail, one variant per pipeline step.
#[derive(Debug, Error)]
pub enum GrayscaleError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to load image {}: {source}", path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("no compute platform available: {0}")]
    Platform(String),

    #[error("no usable compute device: {0}")]
    Device(String),

    #[error("failed to create device context: {0}")]
    Context(#[from] wgpu::RequestDeviceError),

    #[error("command queue did not complete: {0}")]
    Queue(String),

    #[error("kernel compilation failed:\n{log}")]
    Compile { log: BuildLog },

    #[error("failed to create kernel `{entry_point}`: {reason}")]
    KernelCreate { entry_point: String, reason: String },

    #[error("failed to allocate {label} buffer ({size} bytes): {reason}")]
    BufferAlloc {
        label: &'static str,
        size: u64,
        reason: String,
    },

    #[error("failed to bind kernel arguments: {0}")]
    ArgBind(String),

    #[error("failed to dispatch kernel: {0}")]
    Dispatch(String),

    #[error("failed to read output buffer: {0}")]
    ReadBack(#[from] wgpu::BufferAsyncError),

    #[error("failed to create output directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to save output image {}: {reason}", path.display())]
    Encode { path: PathBuf, reason: String },

    #[error("failed to release device resources: {0}")]
    Cleanup(String),
}

impl GrayscaleError {
    /// Short name of the pipeline step that failed, for log lines.
    pub fn step(&self) -> &'static str {
        match self {
            GrayscaleError::Config(_) => "config",
            GrayscaleError::ImageLoad { .. } => "decode",
            GrayscaleError::Platform(_) => "platform",
            GrayscaleError::Device(_) => "device",
            GrayscaleError::Context(_) => "context",
            GrayscaleError::Queue(_) => "queue",
            GrayscaleError::Compile { .. } => "compile",
            GrayscaleError::KernelCreate { .. } => "kernel",
            GrayscaleError::BufferAlloc { .. } => "alloc",
            GrayscaleError::ArgBind(_) => "bind",
            GrayscaleError::Dispatch(_) => "dispatch",
            GrayscaleError::ReadBack(_) => "readback",
            GrayscaleError::Directory { .. } => "directory",
            GrayscaleError::Encode { .. } => "encode",
            GrayscaleError::Cleanup(_) => "cleanup",
        }
    }

    /// Process exit status for this error. Every failure is terminal.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

pub type Result<T> = std::result::Result<T, GrayscaleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_step_exits_with_one() {
        let errors = [
            GrayscaleError::Config("quality 0".into()),
            GrayscaleError::Platform("none".into()),
            GrayscaleError::Device("none".into()),
            GrayscaleError::Queue("closed".into()),
            GrayscaleError::ArgBind("bad".into()),
            GrayscaleError::Dispatch("bad".into()),
            GrayscaleError::Cleanup("bad".into()),
        ];
        for e in &errors {
            assert_eq!(e.exit_code(), 1, "{} should exit with 1", e.step());
        }
    }

    #[test]
    fn test_buffer_alloc_message_names_buffer() {
        let e = GrayscaleError::BufferAlloc {
            label: "input",
            size: 12,
            reason: "exceeds limit".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("input"));
        assert!(msg.contains("12 bytes"));
        assert_eq!(e.step(), "alloc");
    }

    #[test]
    fn test_directory_error_keeps_io_source() {
        use std::error::Error as _;
        let e = GrayscaleError::Directory {
            path: PathBuf::from("/nope"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("/nope"));
    }
}
