//! Frame decoding and canvas rendering.

use std::sync::Arc;

use fast_image_resize as fr;
use image::RgbImage;

use crate::camera::frame_buffer::Frame;
use crate::camera::source::Snapshot;
use crate::capture::error::{CaptureError, Result};
use crate::capture::geometry::FrameGeometry;
use crate::settings::config::CaptureConfig;

/// RGB8 pixels ready for rendering.
///
/// Raw frames from a video source are borrowed through their `Arc`; only
/// encoded snapshots allocate a buffer of their own.
pub enum RawFrame {
    Decoded(RgbImage),
    Shared(Arc<Frame>),
}

impl RawFrame {
    pub fn width(&self) -> u32 {
        match self {
            Self::Decoded(image) => image.width(),
            Self::Shared(frame) => frame.width,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Self::Decoded(image) => image.height(),
            Self::Shared(frame) => frame.height,
        }
    }

    /// Packed RGB24 rows, no padding.
    pub fn pixels(&self) -> &[u8] {
        match self {
            Self::Decoded(image) => image.as_raw(),
            Self::Shared(frame) => &frame.data,
        }
    }
}

/// Decode a snapshot into pixels.
///
/// Fails with [`CaptureError::Decode`] when the payload is not an image,
/// has a zero dimension, or a raw buffer does not match its stated size.
pub fn decode(snapshot: &Snapshot) -> Result<RawFrame> {
    let frame = match snapshot {
        Snapshot::Encoded(bytes) => RawFrame::Decoded(
            image::load_from_memory(bytes)
                .map_err(|e| CaptureError::Decode(e.to_string()))?
                .to_rgb8(),
        ),
        Snapshot::Rgb(frame) => {
            let expected = (frame.width as usize)
                .checked_mul(frame.height as usize)
                .and_then(|n| n.checked_mul(3))
                .ok_or_else(|| {
                    CaptureError::Decode(format!(
                        "frame dimensions {}x{} overflow",
                        frame.width, frame.height
                    ))
                })?;
            if frame.data.len() != expected {
                return Err(CaptureError::Decode(format!(
                    "RGB buffer is {} bytes, expected {expected} for {}x{}",
                    frame.data.len(),
                    frame.width,
                    frame.height
                )));
            }
            RawFrame::Shared(Arc::clone(frame))
        }
    };

    if frame.width() == 0 || frame.height() == 0 {
        return Err(CaptureError::Decode(format!(
            "decoded frame has no pixels ({}x{})",
            frame.width(),
            frame.height()
        )));
    }
    Ok(frame)
}

/// Draw the crop region of `frame` into a fresh black output canvas.
///
/// The destination rectangle is snapped to whole pixels; anything that falls
/// outside the canvas is discarded. A crop region with no source pixels is a
/// [`CaptureError::Render`], never a blank canvas.
pub fn render(
    frame: &RawFrame,
    geometry: &FrameGeometry,
    config: &CaptureConfig,
) -> Result<RgbImage> {
    if geometry.is_empty() {
        return Err(CaptureError::Render(format!(
            "crop region {:?} has no source pixels",
            geometry.crop
        )));
    }
    let mut canvas = RgbImage::new(config.output_width, config.output_height);

    let draw = geometry.draw;
    let left = draw.dest_x.round();
    let top = draw.dest_y.round();
    let dst_width = ((draw.dest_x + draw.dest_width).round() - left).max(1.0) as u32;
    let dst_height = ((draw.dest_y + draw.dest_height).round() - top).max(1.0) as u32;

    let src = fr::images::ImageRef::new(
        frame.width(),
        frame.height(),
        frame.pixels(),
        fr::PixelType::U8x3,
    )
    .map_err(|e| CaptureError::Render(e.to_string()))?;
    let mut dst = fr::images::Image::new(dst_width, dst_height, fr::PixelType::U8x3);

    let crop = geometry.crop;
    let options = fr::ResizeOptions::new()
        .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear))
        .crop(crop.x, crop.y, crop.width, crop.height);
    let mut resizer = fr::Resizer::new();
    resizer
        .resize(&src, &mut dst, &options)
        .map_err(|e| CaptureError::Render(e.to_string()))?;

    let drawn = RgbImage::from_raw(dst_width, dst_height, dst.into_vec())
        .ok_or_else(|| CaptureError::Render("resized buffer size mismatch".to_string()))?;
    image::imageops::overlay(&mut canvas, &drawn, left as i64, top as i64);

    Ok(canvas)
}
