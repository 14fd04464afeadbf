// Video sources the capture pipeline reads from.

pub mod frame_buffer;
pub mod source;
pub mod still;
