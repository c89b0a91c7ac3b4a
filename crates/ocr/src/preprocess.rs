use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};
use suito_core::TraceContext;
use thiserror::Error;
use tracing::{error, info};

use crate::geometry;
use crate::orientation::OrientationAnalyzer;
use crate::region::PaperRegionDetector;

/// MIME type of the bytes produced by a successful normalization.
pub const OUTPUT_MIME: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
    #[error("Failed to read image: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
    #[error("Image processing panicked")]
    Panicked,
}

/// Upright, shadow-free grayscale rendition of a photographed form.
///
/// Stages: EXIF orientation → paper region → 90° check → 180° check →
/// shadow removal → JPEG.
pub struct ImageNormalizer;

impl ImageNormalizer {
    /// Normalize raw photo bytes. On any failure the input is handed back
    /// untouched so recognition can still run on the original.
    pub fn normalize_bytes(data: &[u8], ctx: &TraceContext) -> Vec<u8> {
        info!(trace_id = %ctx, bytes = data.len(), "normalizing image (rotation & shadow removal)");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| Self::try_normalize_bytes(data)))
            .unwrap_or(Err(PreprocessError::Panicked));

        match outcome {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(trace_id = %ctx, error = %e, "image normalization failed, passing original through");
                data.to_vec()
            }
        }
    }

    pub fn try_normalize_bytes(data: &[u8]) -> Result<Vec<u8>, PreprocessError> {
        let img = decode_upright(data)?;
        encode_as_jpeg(Self::normalize(img))
    }

    pub fn normalize(img: DynamicImage) -> DynamicImage {
        let mut color = img;
        let mut gray = geometry::to_gray(&color);

        let mut mask = PaperRegionDetector::detect(&gray);
        if let Some(rotation) = OrientationAnalyzer::analyze_quarter_turn(&gray, &mask) {
            color = geometry::rotate_image(&color, rotation);
            gray = geometry::rotate_gray(&gray, rotation);
            mask = mask.rotate(rotation);
        }

        if let Some(rotation) = OrientationAnalyzer::analyze_half_turn(&gray, &mask) {
            color = geometry::rotate_image(&color, rotation);
        }

        info!("removing shadows");
        let final_gray = geometry::to_gray(&color);
        DynamicImage::ImageLuma8(geometry::remove_shadows(&final_gray))
    }
}

/// Decode and apply the EXIF orientation tag, if present.
fn decode_upright(data: &[u8]) -> Result<DynamicImage, PreprocessError> {
    let mut decoder = ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut img = DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);
    Ok(img)
}

fn encode_as_jpeg(img: DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}

/// MIME type of encoded image bytes, sniffed from the magic number.
pub fn sniff_mime(data: &[u8]) -> &'static str {
    image::guess_format(data)
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream")
}
