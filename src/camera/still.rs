use std::path::PathBuf;
use std::sync::Arc;

use crate::camera::frame_buffer::Frame;
use crate::camera::source::{Snapshot, VideoSource};

const DUMMY_WIDTH: u32 = 1280;
const DUMMY_HEIGHT: u32 = 720;
const DATA_URL_SCHEME: &[u8] = b"data:";

/// Video source backed by an image file on disk.
///
/// The file is re-read on every screenshot so it can be swapped out while
/// the process runs. It may hold encoded image bytes or a base64 `data:` URL
/// such as one saved from an earlier capture. A missing or malformed file
/// reads as "no frame".
pub struct StillImageSource {
    path: PathBuf,
}

impl StillImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl VideoSource for StillImageSource {
    fn screenshot(&self) -> Option<Snapshot> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.starts_with(DATA_URL_SCHEME) => {
                let snapshot = std::str::from_utf8(&bytes)
                    .ok()
                    .and_then(|url| Snapshot::from_data_url(url.trim_end()));
                if snapshot.is_none() {
                    tracing::warn!("still image {} is not a valid data URL", self.path.display());
                }
                snapshot
            }
            Ok(bytes) if !bytes.is_empty() => Some(Snapshot::Encoded(bytes)),
            Ok(_) => {
                tracing::warn!("still image {} is empty", self.path.display());
                None
            }
            Err(e) => {
                tracing::warn!("failed to read still image {}: {e}", self.path.display());
                None
            }
        }
    }
}

/// A fake camera producing a gradient test pattern.
///
/// Enable via `DUMMY_CAMERA=1` environment variable.
pub struct DummySource {
    frame: Arc<Frame>,
}

impl DummySource {
    /// Create a dummy camera at the default 1280x720 resolution.
    pub fn new() -> Self {
        Self::with_size(DUMMY_WIDTH, DUMMY_HEIGHT)
    }

    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            frame: Arc::new(test_pattern(width, height)),
        }
    }

    /// Whether the dummy camera is enabled via environment variable.
    pub fn is_enabled() -> bool {
        std::env::var("DUMMY_CAMERA").is_ok_and(|v| v == "1" || v == "true")
    }
}

impl Default for DummySource {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSource for DummySource {
    fn screenshot(&self) -> Option<Snapshot> {
        Some(Snapshot::Rgb(Arc::clone(&self.frame)))
    }
}

/// Gradient pattern: red follows x, green follows y, blue is constant.
pub fn test_pattern(width: u32, height: u32) -> Frame {
    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            data.push((x % 256) as u8);
            data.push((y % 256) as u8);
            data.push(128);
        }
    }
    Frame {
        data,
        width,
        height,
        timestamp_us: 0,
    }
}
