use std::sync::Arc;

use base64::Engine;

use crate::camera::frame_buffer::Frame;

/// The current frame as handed out by a video source.
///
/// Sources either expose an encoded still (JPEG, PNG, ...) the way a
/// browser webcam screenshot does, or a raw RGB frame straight from a
/// capture thread. Either way the pipeline decodes it before use.
#[derive(Clone)]
pub enum Snapshot {
    /// Encoded image bytes.
    Encoded(Vec<u8>),
    /// Raw packed RGB24 frame.
    Rgb(Arc<Frame>),
}

impl Snapshot {
    /// Parse a base64 `data:` URL such as `data:image/jpeg;base64,/9j/...`.
    ///
    /// Returns `None` for anything that is not a base64 data URL with a
    /// decodable payload.
    pub fn from_data_url(url: &str) -> Option<Self> {
        let rest = url.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        if !header.ends_with(";base64") {
            return None;
        }
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .ok()
            .map(Self::Encoded)
    }

    /// Size of the payload in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::Encoded(bytes) => bytes.len(),
            Self::Rgb(frame) => frame.data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encoded(bytes) => write!(f, "Snapshot::Encoded({} bytes)", bytes.len()),
            Self::Rgb(frame) => write!(f, "Snapshot::Rgb({}x{})", frame.width, frame.height),
        }
    }
}

/// A live video feed that can be asked for its current frame.
///
/// Opening the device and negotiating resolution happen elsewhere; the
/// pipeline only needs the latest frame on demand.
pub trait VideoSource: Send + Sync {
    /// Return the current frame, or `None` if no frame is ready (camera not
    /// started, stream stopped, access denied).
    fn screenshot(&self) -> Option<Snapshot>;
}
