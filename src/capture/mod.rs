// Capture pipeline: frame decode through JPEG delivery.

pub mod compress;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod render;
pub mod sink;
