use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::capture::error::{CaptureError, Result};

const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// A captured image, encoded as a `data:image/jpeg;base64,...` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage(String);

impl EncodedImage {
    /// Wrap raw JPEG bytes in a data URL.
    pub fn from_jpeg(jpeg: &[u8]) -> Self {
        let mut url = String::with_capacity(JPEG_DATA_URL_PREFIX.len() + jpeg.len() * 4 / 3 + 4);
        url.push_str(JPEG_DATA_URL_PREFIX);
        base64::engine::general_purpose::STANDARD.encode_string(jpeg, &mut url);
        Self(url)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Decode the data URL back into JPEG bytes.
    pub fn jpeg_bytes(&self) -> Result<Vec<u8>> {
        let payload = self
            .0
            .strip_prefix(JPEG_DATA_URL_PREFIX)
            .ok_or_else(|| CaptureError::Encode("not a JPEG data URL".to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| CaptureError::Encode(e.to_string()))
    }
}

impl std::fmt::Display for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compress an RGB canvas to JPEG at the given quality (1-100).
pub fn compress_jpeg(canvas: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    canvas
        .write_with_encoder(encoder)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Compress a canvas and wrap it as a data URL.
pub fn encode_canvas(canvas: &RgbImage, quality: u8) -> Result<EncodedImage> {
    let jpeg = compress_jpeg(canvas, quality)?;
    Ok(EncodedImage::from_jpeg(&jpeg))
}
