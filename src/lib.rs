//! Still-frame capture from a live video source.
//!
//! A [`CapturePipeline`] asks its [`VideoSource`] for the current frame,
//! crops a fixed 400x400 region near the centre, cover-scales it into a
//! 480x360 canvas, and hands the JPEG data URL to an [`OutputSink`].

pub mod camera;
pub mod capture;
pub mod diagnostics;
pub mod settings;

use std::sync::Arc;

pub use camera::frame_buffer::{Frame, FrameBuffer};
pub use camera::source::{Snapshot, VideoSource};
pub use camera::still::{DummySource, StillImageSource};
pub use capture::compress::EncodedImage;
pub use capture::error::CaptureError;
pub use capture::pipeline::CapturePipeline;
pub use capture::sink::OutputSink;
pub use settings::config::CaptureConfig;

/// Pick the video source for a CLI or host that has no live camera.
///
/// When `DUMMY_CAMERA=1` is set, a simulated camera is used regardless of
/// `still_path`.
pub fn create_source(still_path: Option<&std::path::Path>) -> Option<Arc<dyn VideoSource>> {
    if DummySource::is_enabled() {
        tracing::info!("DUMMY_CAMERA set, using test pattern source");
        return Some(Arc::new(DummySource::new()));
    }
    still_path.map(|path| Arc::new(StillImageSource::new(path)) as Arc<dyn VideoSource>)
}
