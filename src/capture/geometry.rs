//! Crop and placement geometry for a single capture.
//!
//! Pure arithmetic on frame dimensions; no pixels are touched here. All
//! coordinates are `f64` so sub-pixel crop origins (odd frame sizes) and
//! negative placement offsets survive until rendering.

use serde::Serialize;

use crate::settings::config::CaptureConfig;

/// Nominal region sampled from the source, before clipping to frame bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Sample region clipped to the source frame.
///
/// Always satisfies `x >= 0`, `y >= 0`, `x + width <= frame width` and
/// `y + height <= frame height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CropRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Destination rectangle in output canvas coordinates.
///
/// May extend past the canvas on one axis (cover scaling).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRect {
    pub dest_x: f64,
    pub dest_y: f64,
    pub dest_width: f64,
    pub dest_height: f64,
}

/// Everything the renderer needs to draw one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameGeometry {
    pub crop_start_x: f64,
    pub crop_start_y: f64,
    pub sample: SampleRect,
    pub crop: CropRegion,
    /// Where the full sample region lands on the canvas.
    pub placement: PlacementRect,
    /// Where the clipped crop region lands. Equals `placement` unless the
    /// sample hangs off the frame edge.
    pub draw: PlacementRect,
}

impl FrameGeometry {
    /// Whether the sample region had to be clipped to fit the frame.
    pub fn is_clipped(&self) -> bool {
        self.crop.width < self.sample.width || self.crop.height < self.sample.height
    }

    /// Whether any source pixels remain after clipping.
    pub fn is_empty(&self) -> bool {
        self.crop.width <= 0.0 || self.crop.height <= 0.0
    }
}

/// Cover-scale a `sample_width x sample_height` source into the output frame
/// and centre it.
pub fn cover_placement(config: &CaptureConfig) -> PlacementRect {
    let output_width = f64::from(config.output_width);
    let output_height = f64::from(config.output_height);
    let source_aspect_ratio = f64::from(config.sample_width) / f64::from(config.sample_height);

    let mut dest_width = output_width;
    let mut dest_height = output_height;
    if output_width / output_height > source_aspect_ratio {
        dest_height = output_width / source_aspect_ratio;
    } else {
        dest_width = output_height * source_aspect_ratio;
    }

    PlacementRect {
        dest_x: (output_width - dest_width) / 2.0,
        dest_y: (output_height - dest_height) / 2.0,
        dest_width,
        dest_height,
    }
}

/// Compute crop and placement for a frame of the given dimensions.
pub fn compute(frame_width: u32, frame_height: u32, config: &CaptureConfig) -> FrameGeometry {
    let frame_width = f64::from(frame_width);
    let frame_height = f64::from(frame_height);

    let crop_start_x = ((frame_width - f64::from(config.crop_target_width)) / 2.0).max(0.0);
    let crop_start_y = ((frame_height - f64::from(config.crop_target_height)) / 2.0).max(0.0);

    let sample = SampleRect {
        x: crop_start_x,
        y: crop_start_y,
        width: f64::from(config.sample_width),
        height: f64::from(config.sample_height),
    };

    let crop_x = sample.x.min(frame_width);
    let crop_y = sample.y.min(frame_height);
    let crop = CropRegion {
        x: crop_x,
        y: crop_y,
        width: ((sample.x + sample.width).min(frame_width) - crop_x).max(0.0),
        height: ((sample.y + sample.height).min(frame_height) - crop_y).max(0.0),
    };

    let placement = cover_placement(config);

    // Shrink the destination by the same proportion the source was clipped,
    // as a 2D canvas drawImage does for out-of-bounds source rects.
    let scale_x = placement.dest_width / sample.width;
    let scale_y = placement.dest_height / sample.height;
    let draw = PlacementRect {
        dest_x: placement.dest_x + (crop.x - sample.x) * scale_x,
        dest_y: placement.dest_y + (crop.y - sample.y) * scale_y,
        dest_width: crop.width * scale_x,
        dest_height: crop.height * scale_y,
    };

    FrameGeometry {
        crop_start_x,
        crop_start_y,
        sample,
        crop,
        placement,
        draw,
    }
}
