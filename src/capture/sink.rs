use crate::capture::compress::EncodedImage;

/// Receives the result of each successful capture.
///
/// Called exactly once per successful capture and never on failure. The
/// sink takes ownership of the image and handles its own errors.
pub trait OutputSink: Send + Sync {
    fn deliver(&self, image: EncodedImage);
}

impl<F> OutputSink for F
where
    F: Fn(EncodedImage) + Send + Sync,
{
    fn deliver(&self, image: EncodedImage) {
        self(image)
    }
}
