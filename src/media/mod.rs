//! Photo preparation for story uploads.

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader};

use crate::app::{Result, StoryError};

const START_QUALITY: u8 = 100;
const QUALITY_STEP: u8 = 5;
const MIN_QUALITY: u8 = 5;

#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub bytes: Vec<u8>,
    pub quality: u8,
}

/// Decode the image at `path` and re-encode it as JPEG, lowering quality in
/// steps of 5 until it fits in `max_bytes`.
pub fn compress_image(path: &Path, max_bytes: usize) -> Result<CompressedImage> {
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    compress(&image, max_bytes)
}

pub fn compress(image: &DynamicImage, max_bytes: usize) -> Result<CompressedImage> {
    // JPEG has no alpha channel.
    let rgb = image.to_rgb8();

    let mut quality = START_QUALITY;
    loop {
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality).encode_image(&rgb)?;

        if bytes.len() <= max_bytes {
            tracing::debug!(
                "Encoded photo at quality {} ({} bytes, limit {})",
                quality,
                bytes.len(),
                max_bytes
            );
            return Ok(CompressedImage { bytes, quality });
        }

        if quality <= MIN_QUALITY {
            return Err(StoryError::ImageTooLarge { max_bytes });
        }
        quality = quality.saturating_sub(QUALITY_STEP).max(MIN_QUALITY);
    }
}

/// File name to send with the multipart photo part.
pub fn upload_file_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("photo");
    format!("{}.jpg", stem)
}
