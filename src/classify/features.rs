use image::imageops::{self, FilterType};
use image::RgbImage;

/// Side length of the square patch the classifier was trained on.
pub const PATCH_SIZE: u32 = 15;

/// Length of a flattened patch: `PATCH_SIZE * PATCH_SIZE * 3`.
pub const FEATURE_LEN: usize = (PATCH_SIZE * PATCH_SIZE * 3) as usize;

/// Resize a crop to the training patch size and flatten it row-major,
/// channel-interleaved (R, G, B), scaled to `[0, 1]`.
pub fn patch_features(crop: &RgbImage) -> Vec<f32> {
    let patch = imageops::resize(crop, PATCH_SIZE, PATCH_SIZE, FilterType::Triangle);
    patch
        .into_raw()
        .into_iter()
        .map(|v| v as f32 / 255.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn features_have_fixed_length_for_any_crop() {
        for (w, h) in [(1, 1), (7, 40), (120, 60)] {
            let crop = RgbImage::from_pixel(w, h, Rgb([10, 20, 30]));
            assert_eq!(patch_features(&crop).len(), FEATURE_LEN);
        }
    }

    #[test]
    fn uniform_crop_keeps_channel_order_and_scale() {
        let crop = RgbImage::from_pixel(30, 30, Rgb([255, 0, 51]));
        let features = patch_features(&crop);
        assert!((features[0] - 1.0).abs() < 1e-6);
        assert!(features[1].abs() < 1e-6);
        assert!((features[2] - 0.2).abs() < 1e-6);
    }
}
