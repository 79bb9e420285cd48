// main.rs — Convert the fixed input image to grayscale on the GPU.
//
// No arguments. Exit status 0 on success, 1 on any failure. Log verbosity
// follows RUST_LOG (default: info).

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use gpu_grayscale::{GrayscaleConverter, PipelineConfig};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = GrayscaleConverter::new(PipelineConfig::default()).and_then(|c| c.run());
    match result {
        Ok(report) => {
            tracing::info!(
                width = report.width,
                height = report.height,
                adapter = %report.adapter,
                output = %report.output.display(),
                "program finished successfully"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(step = e.step(), "{e}");
            ExitCode::from(e.exit_code())
        }
    }
}
