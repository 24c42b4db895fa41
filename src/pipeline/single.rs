//! Single-image driver: every spot is classified exactly once.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::classify::{Classifier, SpotStatus};
use crate::error::{PipelineError, Result};
use crate::overlay::{Annotator, Summary};
use crate::spot::{ensure_spots_fit, ParkingSpot};

/// Encoded annotated image plus its counts.
#[derive(Clone, Debug)]
pub struct ImageOutput {
    pub bytes: Vec<u8>,
    pub summary: Summary,
}

pub(crate) fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(|e| PipelineError::DecodeError(format!("input is not a valid image: {}", e)))
}

pub(crate) fn encode_jpeg(frame: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(frame)
        .map_err(|e| PipelineError::EncodeError(format!("jpeg encoding failed: {}", e)))?;
    Ok(out.into_inner())
}

/// Classify every spot of an already decoded frame and annotate it in place.
pub fn annotate_image(
    frame: &mut RgbImage,
    spots: &[ParkingSpot],
    classifier: &Classifier,
    annotator: &Annotator,
) -> Result<Summary> {
    ensure_spots_fit(spots, frame.width(), frame.height())?;
    let statuses = spots
        .iter()
        .map(|spot| classifier.classify(&spot.crop(frame)))
        .collect::<Result<Vec<SpotStatus>>>()?;
    Ok(annotator.annotate(frame, spots, &statuses))
}

pub(crate) fn process_image(
    bytes: &[u8],
    spots: &[ParkingSpot],
    classifier: &Classifier,
    annotator: &Annotator,
    jpeg_quality: u8,
) -> Result<ImageOutput> {
    let mut frame = decode_image(bytes)?;
    let summary = annotate_image(&mut frame, spots, classifier, annotator)?;
    let bytes = encode_jpeg(&frame, jpeg_quality)?;
    log::info!(
        "image processed: {} free, {} occupied, {} total",
        summary.free,
        summary.occupied,
        summary.total
    );
    Ok(ImageOutput { bytes, summary })
}
