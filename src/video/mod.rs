//! Frame-sequential video input and output.
//!
//! The video driver only talks to `FrameSource` and `FrameSink`. Container
//! decoding and encoding live behind those traits:
//! - In-memory frames (`MemorySource` / `MemorySink`), always available
//! - FFmpeg-backed MP4 decode/encode (feature: video-ffmpeg)
//!
//! Sinks must not hand back bytes for a partially processed stream; a failed
//! run drops the sink and whatever it buffered.

#[cfg(feature = "video-ffmpeg")]
pub(crate) mod ffmpeg;
mod memory;

#[cfg(feature = "video-ffmpeg")]
pub use self::ffmpeg::{FfmpegSink, FfmpegSource};
pub use memory::{MemorySink, MemorySource};

use image::RgbImage;
use serde::Serialize;

use crate::error::Result;

/// Stream geometry and timing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Frames per second as a rational (numerator, denominator).
    pub fps: (i32, i32),
}

impl VideoInfo {
    /// Frame rate as a reduced rational whose denominator fits in
    /// `max_den`, the closest such approximation of `fps`.
    ///
    /// Containers recorded at a variable rate often report rates such as
    /// 2997003/100000, which MPEG-4 time bases cannot express.
    pub fn bounded_fps(&self, max_den: i32) -> (i32, i32) {
        approximate_rational(self.fps.0, self.fps.1, max_den)
    }
}

/// Best rational approximation of `num / den` with denominator at most
/// `max_den`, via continued fraction convergents and semiconvergents.
pub(crate) fn approximate_rational(num: i32, den: i32, max_den: i32) -> (i32, i32) {
    if num <= 0 || den <= 0 || max_den <= 0 {
        return (num, den);
    }
    let g = gcd(num as i64, den as i64);
    let (num, den) = (num as i64 / g, den as i64 / g);
    let max_den = max_den as i64;
    if den <= max_den {
        return (num as i32, den as i32);
    }

    // Convergents p/q; (p0, q0) is the one before (p1, q1).
    let (mut p0, mut q0, mut p1, mut q1) = (0_i64, 1_i64, 1_i64, 0_i64);
    let (mut n, mut d) = (num, den);
    while d != 0 {
        let a = n / d;
        let q2 = q0 + a * q1;
        if q2 > max_den {
            // Largest semiconvergent still within bounds.
            let k = (max_den - q0) / q1;
            let (ps, qs) = (p0 + k * p1, q0 + k * q1);
            let target = num as f64 / den as f64;
            let err_s = (ps as f64 / qs as f64 - target).abs();
            let err_c = (p1 as f64 / q1 as f64 - target).abs();
            return if err_s < err_c {
                (ps as i32, qs as i32)
            } else {
                (p1 as i32, q1 as i32)
            };
        }
        let p2 = p0 + a * p1;
        (p0, q0, p1, q1) = (p1, q1, p2, q2);
        (n, d) = (d, n - a * d);
    }
    (p1 as i32, q1 as i32)
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Ordered source of decoded RGB frames.
pub trait FrameSource {
    fn info(&self) -> VideoInfo;

    /// Next frame in presentation order, or `None` once exhausted.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// Ordered consumer of annotated frames.
pub trait FrameSink {
    fn push(&mut self, frame: &RgbImage) -> Result<()>;

    /// Finalize the stream and return the encoded bytes.
    fn finish(self) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(fps: (i32, i32)) -> VideoInfo {
        VideoInfo {
            width: 64,
            height: 48,
            fps,
        }
    }

    #[test]
    fn representable_rates_are_only_reduced() {
        assert_eq!(info((30000, 1001)).bounded_fps(65535), (30000, 1001));
        assert_eq!(info((50, 2)).bounded_fps(65535), (25, 1));
    }

    #[test]
    fn variable_rate_is_approximated_within_bound() {
        let (num, den) = info((2997003, 100000)).bounded_fps(65535);
        assert!(den > 0 && den <= 65535);
        let approx = num as f64 / den as f64;
        assert!((approx - 29.97003).abs() < 1e-6, "got {num}/{den}");
    }

    #[test]
    fn picks_closest_fraction_under_bound() {
        assert_eq!(approximate_rational(1000, 3001, 100), (1, 3));
        assert_eq!(approximate_rational(2997003, 100000, 65535), (1009001, 33667));
        assert_eq!(approximate_rational(314159, 100000, 10), (22, 7));
    }
}
