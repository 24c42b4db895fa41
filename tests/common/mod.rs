#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use image::{GrayImage, Luma, Rgb, RgbImage};

use parkwatch::{
    extract_spots, Classifier, OccupancyBackend, ParkingSpot, SpotStatus, VideoInfo,
};

pub const WIDTH: u32 = 40;
pub const HEIGHT: u32 = 20;
pub const DARK: u8 = 20;
pub const BRIGHT: u8 = 230;

/// Three 8x8 spots on one row.
pub fn spot_mask() -> GrayImage {
    let mut mask = GrayImage::new(WIDTH, HEIGHT);
    for x0 in [2, 16, 30] {
        for y in 6..14 {
            for x in x0..x0 + 8 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
    }
    mask
}

pub fn spots() -> Vec<ParkingSpot> {
    extract_spots(&spot_mask()).expect("mask has spots")
}

pub fn info() -> VideoInfo {
    VideoInfo {
        width: WIDTH,
        height: HEIGHT,
        fps: (25, 1),
    }
}

/// Dark frame with the given spots filled bright.
pub fn frame_with(bright_spots: &[usize]) -> RgbImage {
    let mut frame = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([DARK, DARK, DARK]));
    let spots = spots();
    for &i in bright_spots {
        let s = spots[i];
        for y in s.y..s.y + s.height {
            for x in s.x..s.x + s.width {
                frame.put_pixel(x, y, Rgb([BRIGHT, BRIGHT, BRIGHT]));
            }
        }
    }
    frame
}

/// Bright patches are occupied; counts every predict call.
pub struct CountingBackend {
    pub calls: Arc<AtomicUsize>,
}

impl OccupancyBackend for CountingBackend {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn predict(&self, features: &[f32]) -> anyhow::Result<SpotStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mean = features.iter().sum::<f32>() / features.len() as f32;
        Ok(if mean > 0.5 {
            SpotStatus::Occupied
        } else {
            SpotStatus::Empty
        })
    }
}

pub fn counting_classifier() -> (Classifier, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let classifier = Classifier::new(CountingBackend {
        calls: calls.clone(),
    });
    (classifier, calls)
}

pub struct FailingBackend;

impl OccupancyBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn predict(&self, _features: &[f32]) -> anyhow::Result<SpotStatus> {
        Err(anyhow!("model rejected input"))
    }
}
