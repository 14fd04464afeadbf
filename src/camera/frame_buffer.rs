use parking_lot::Mutex;
use std::sync::Arc;

use crate::camera::source::{Snapshot, VideoSource};

/// A single raw frame from the camera.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Packed RGB24 pixel data, row-major, no padding.
    pub data: Vec<u8>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Capture timestamp in microseconds.
    pub timestamp_us: u64,
}

/// Thread-safe ring buffer for camera frames.
///
/// A capture thread pushes frames as they arrive; capture requests read the
/// most recent one. Frames are held in `Arc` so readers never copy pixels.
pub struct FrameBuffer {
    frames: Mutex<Vec<Option<Arc<Frame>>>>,
    capacity: usize,
    write_idx: Mutex<usize>,
}

impl FrameBuffer {
    /// Create a new ring buffer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let frames = (0..capacity).map(|_| None).collect();
        Self {
            frames: Mutex::new(frames),
            capacity,
            write_idx: Mutex::new(0),
        }
    }

    /// Push a new frame, overwriting the oldest if full.
    pub fn push(&self, frame: Frame) {
        if self.capacity == 0 {
            return;
        }
        let mut frames = self.frames.lock();
        let mut idx = self.write_idx.lock();
        frames[*idx] = Some(Arc::new(frame));
        *idx = (*idx + 1) % self.capacity;
    }

    /// Get the most recently pushed frame, if any.
    pub fn latest(&self) -> Option<Arc<Frame>> {
        let frames = self.frames.lock();
        let idx = self.write_idx.lock();
        if self.capacity == 0 {
            return None;
        }
        let latest_idx = if *idx == 0 {
            self.capacity - 1
        } else {
            *idx - 1
        };
        frames[latest_idx].clone()
    }

    /// Drop all buffered frames, e.g. when the stream stops.
    pub fn clear(&self) {
        let mut frames = self.frames.lock();
        frames.iter_mut().for_each(|slot| *slot = None);
    }
}

impl VideoSource for FrameBuffer {
    fn screenshot(&self) -> Option<Snapshot> {
        self.latest().map(Snapshot::Rgb)
    }
}
