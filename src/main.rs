use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use snapcrop_lib::{
    create_source, CaptureConfig, CapturePipeline, DummySource, EncodedImage, VideoSource,
};

/// Capture one cropped still and print it as a JPEG data URL.
#[derive(Debug, Parser)]
#[command(name = "snapcrop", version)]
struct Args {
    /// Image file standing in for the camera's current frame.
    #[arg(short, long, conflicts_with = "dummy")]
    input: Option<PathBuf>,

    /// Use the generated test pattern instead of a file.
    #[arg(long)]
    dummy: bool,

    /// JSON file overriding capture geometry and quality.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the data URL to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match args.config.as_deref().map(CaptureConfig::load).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let source = if args.dummy {
        Some(Arc::new(DummySource::new()) as Arc<dyn VideoSource>)
    } else {
        create_source(args.input.as_deref())
    };
    let Some(source) = source else {
        log::error!("no video source: pass --input <file> or --dummy");
        return ExitCode::from(2);
    };

    let output = args.output;
    let sink = move |image: EncodedImage| {
        let url = image.into_string();
        match &output {
            Some(path) => match std::fs::write(path, &url) {
                Ok(()) => log::info!("wrote capture to {}", path.display()),
                Err(e) => log::error!("failed to write {}: {e}", path.display()),
            },
            None => println!("{url}"),
        }
    };

    let pipeline = match CapturePipeline::new(source, Arc::new(sink), config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let config = pipeline.config();
    log::debug!(
        "capturing {}x{} at JPEG quality {}",
        config.output_width,
        config.output_height,
        config.jpeg_quality
    );

    match pipeline.capture().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("capture failed: {e}");
            ExitCode::FAILURE
        }
    }
}
