//! Per-spot change score between two frames.
//!
//! The score is the absolute difference of mean intensity over all pixels
//! and channels. It is a brightness proxy, not a structural comparison.

use image::{GenericImageView, RgbImage};

use crate::spot::ParkingSpot;

/// Mean over all pixels and channels of a view.
fn mean_intensity<V>(view: &V) -> f64
where
    V: GenericImageView<Pixel = image::Rgb<u8>>,
{
    let (w, h) = view.dimensions();
    let samples = w as u64 * h as u64 * 3;
    if samples == 0 {
        return 0.0;
    }
    let sum: u64 = view
        .pixels()
        .map(|(_, _, p)| p.0.iter().map(|&c| c as u64).sum::<u64>())
        .sum();
    sum as f64 / samples as f64
}

/// `|mean(a) - mean(b)|` for two equally shaped crops or views.
///
/// # Panics
///
/// Panics when the crops differ in shape.
pub fn diff_score<A, B>(a: &A, b: &B) -> f64
where
    A: GenericImageView<Pixel = image::Rgb<u8>>,
    B: GenericImageView<Pixel = image::Rgb<u8>>,
{
    assert_eq!(
        a.dimensions(),
        b.dimensions(),
        "diff_score requires crops of identical shape"
    );
    (mean_intensity(a) - mean_intensity(b)).abs()
}

/// Change score of one spot between two full frames of equal resolution.
///
/// Works on sub-views, so no crop is copied.
///
/// # Panics
///
/// Panics when the frames differ in resolution or the spot is out of bounds.
pub fn spot_diff(current: &RgbImage, previous: &RgbImage, spot: &ParkingSpot) -> f64 {
    assert_eq!(
        current.dimensions(),
        previous.dimensions(),
        "spot_diff requires frames of identical resolution"
    );
    let a = current.view(spot.x, spot.y, spot.width, spot.height);
    let b = previous.view(spot.x, spot.y, spot.width, spot.height);
    diff_score(&*a, &*b)
}
