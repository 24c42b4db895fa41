//! Parking spot geometry.
//!
//! Spots come from a single-channel mask where every connected white region
//! marks one parking space. Components are labelled with 4-connectivity and
//! each label's bounding box becomes a `ParkingSpot`. The extraction order is
//! the label order of the scan, and every per-spot array in a run (status,
//! diff score) is indexed positionally against it.

use std::path::Path;

use image::{GrayImage, Luma, RgbImage};
use imageproc::region_labelling::{connected_components, Connectivity};
use serde::Serialize;

use crate::error::{PipelineError, Result};

/// Axis-aligned spot rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ParkingSpot {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ParkingSpot {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when the whole rectangle lies inside a `width` x `height` frame.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x
            .checked_add(self.width)
            .is_some_and(|right| right <= width)
            && self
                .y
                .checked_add(self.height)
                .is_some_and(|bottom| bottom <= height)
    }

    /// Copy this spot's region out of a frame.
    pub fn crop(&self, frame: &RgbImage) -> RgbImage {
        image::imageops::crop_imm(frame, self.x, self.y, self.width, self.height).to_image()
    }
}

/// Read a mask image from disk and convert it to single-channel luma.
pub fn load_mask<P: AsRef<Path>>(path: P) -> Result<GrayImage> {
    let path = path.as_ref();
    let mask = image::open(path).map_err(|e| {
        PipelineError::InvalidMask(format!("failed to read mask {}: {}", path.display(), e))
    })?;
    Ok(mask.to_luma8())
}

/// Extract one spot per non-background connected component, in label order.
pub fn extract_spots(mask: &GrayImage) -> Result<Vec<ParkingSpot>> {
    // Binarise first: the labeller only joins pixels of equal value, and any
    // non-zero mask pixel counts as spot area.
    let binary = GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get_pixel(x, y).0[0] == 0 {
            Luma([0])
        } else {
            Luma([255])
        }
    });

    let labels = connected_components(&binary, Connectivity::Four, Luma([0u8]));

    // Label 0 is background; the rest are dense and start at 1.
    let mut bounds: Vec<[u32; 4]> = Vec::new();
    for (x, y, pixel) in labels.enumerate_pixels() {
        let label = pixel.0[0] as usize;
        if label == 0 {
            continue;
        }
        if bounds.len() < label {
            bounds.resize(label, [u32::MAX, u32::MAX, 0, 0]);
        }
        let b = &mut bounds[label - 1];
        b[0] = b[0].min(x);
        b[1] = b[1].min(y);
        b[2] = b[2].max(x);
        b[3] = b[3].max(y);
    }

    if bounds.is_empty() {
        return Err(PipelineError::InvalidMask(
            "mask has no connected components".to_string(),
        ));
    }

    let spots: Vec<ParkingSpot> = bounds
        .into_iter()
        .map(|[x0, y0, x1, y1]| ParkingSpot::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1))
        .collect();

    log::info!("extracted {} parking spots from mask", spots.len());
    Ok(spots)
}

/// Reject masks whose spots fall outside the frame they are applied to.
pub(crate) fn ensure_spots_fit(spots: &[ParkingSpot], width: u32, height: u32) -> Result<()> {
    match spots.iter().position(|s| !s.fits_within(width, height)) {
        None => Ok(()),
        Some(index) => Err(PipelineError::InvalidMask(format!(
            "spot {} {:?} lies outside the {}x{} frame",
            index, spots[index], width, height
        ))),
    }
}
