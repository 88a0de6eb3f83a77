//! Cover image processing before embedding
//!
//! Player compatibility constraints: baseline JPEG, bounded dimensions,
//! bounded file size with quality back-off.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use tracing::{debug, warn};

use crate::error::SyncError;

/// Maximum dimension for cover art (width or height)
const MAX_COVER_SIZE: u32 = 300;

/// Starting JPEG quality (0-100)
const JPEG_QUALITY: u8 = 75;

/// Maximum encoded size in bytes (200KB)
const MAX_COVER_BYTES: usize = 200 * 1024;

/// Decode a cover image, bound its dimensions, and re-encode as baseline
/// JPEG under the size cap, stepping quality down as needed.
pub fn process_cover(data: &[u8]) -> Result<Vec<u8>, SyncError> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| SyncError::Artwork(format!("cannot guess image format: {}", e)))?
        .decode()
        .map_err(|e| SyncError::Artwork(format!("cannot decode cover image: {}", e)))?;

    let img = resize_to_fit(img);

    let mut quality = JPEG_QUALITY;
    loop {
        let mut output = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut output, quality);
        encoder
            .encode_image(&img)
            .map_err(|e| SyncError::Artwork(format!("cannot encode cover as JPEG: {}", e)))?;

        if output.len() <= MAX_COVER_BYTES || quality <= 50 {
            debug!(
                "Processed cover: {}x{} -> {} bytes (quality {})",
                img.width(),
                img.height(),
                output.len(),
                quality
            );
            return Ok(output);
        }

        warn!(
            "Cover too large ({} bytes), reducing quality from {} to {}",
            output.len(),
            quality,
            quality - 10
        );
        quality -= 10;
    }
}

/// Resize to fit within MAX_COVER_SIZE, keeping aspect ratio
fn resize_to_fit(img: DynamicImage) -> DynamicImage {
    let (width, height) = (img.width(), img.height());

    if width <= MAX_COVER_SIZE && height <= MAX_COVER_SIZE {
        return img;
    }

    let (new_width, new_height) = if width > height {
        let ratio = MAX_COVER_SIZE as f64 / width as f64;
        (MAX_COVER_SIZE, (height as f64 * ratio) as u32)
    } else {
        let ratio = MAX_COVER_SIZE as f64 / height as f64;
        ((width as f64 * ratio) as u32, MAX_COVER_SIZE)
    };

    debug!(
        "Resizing cover: {}x{} -> {}x{}",
        width, height, new_width, new_height
    );

    img.resize(new_width, new_height, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_small_image_untouched() {
        let img = DynamicImage::new_rgb8(120, 90);
        let resized = resize_to_fit(img);
        assert_eq!(resized.width(), 120);
        assert_eq!(resized.height(), 90);
    }

    #[test]
    fn test_resize_large_image_bounded() {
        let img = DynamicImage::new_rgb8(1500, 1000);
        let resized = resize_to_fit(img);
        assert_eq!(resized.width(), MAX_COVER_SIZE);
        assert!(resized.height() <= MAX_COVER_SIZE);
    }

    #[test]
    fn test_process_cover_rejects_garbage() {
        assert!(process_cover(b"not an image").is_err());
    }
}
