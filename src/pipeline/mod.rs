//! Pipeline drivers.
//!
//! `ParkingPipeline` bundles the static inputs of a deployment (spot layout,
//! loaded classifier, overlay style, sampling parameters). It holds no
//! per-run state: every image or video call builds its own scheduler, so one
//! pipeline can serve concurrent requests.

mod single;
mod video;

pub use self::single::{annotate_image, ImageOutput};
pub use self::video::{run_video, FrameTick, VideoOutput, VideoReport};

use crate::classify::Classifier;
use crate::config::ParkwatchConfig;
use crate::error::Result;
use crate::overlay::Annotator;
use crate::scheduler::SamplingConfig;
use crate::spot::{extract_spots, load_mask, ParkingSpot};
use crate::video::{FrameSink, FrameSource};

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

#[derive(Debug)]
pub struct ParkingPipeline {
    spots: Vec<ParkingSpot>,
    classifier: Classifier,
    annotator: Annotator,
    sampling: SamplingConfig,
    jpeg_quality: u8,
}

impl ParkingPipeline {
    pub fn new(
        spots: Vec<ParkingSpot>,
        classifier: Classifier,
        annotator: Annotator,
        sampling: SamplingConfig,
    ) -> Self {
        Self {
            spots,
            classifier,
            annotator,
            sampling,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Load mask and classifier as configured.
    ///
    /// Fails with `InvalidMask` or `ModelUnavailable` before any frame is seen.
    pub fn from_config(config: &ParkwatchConfig) -> Result<Self> {
        let mask = load_mask(&config.mask_path)?;
        let spots = extract_spots(&mask)?;
        let classifier = Classifier::load(&config.classifier)?;

        let annotator = match &config.overlay.font_path {
            None => Annotator::default(),
            Some(path) => Annotator::default().with_font_file(path).unwrap_or_else(|e| {
                log::warn!("overlay font ignored, using built-in glyphs: {:#}", e);
                Annotator::default()
            }),
        };

        Ok(Self::new(spots, classifier, annotator, config.sampling)
            .with_jpeg_quality(config.overlay.jpeg_quality))
    }

    pub fn spots(&self) -> &[ParkingSpot] {
        &self.spots
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn sampling(&self) -> SamplingConfig {
        self.sampling
    }

    /// Decode, classify every spot once, annotate and re-encode as JPEG.
    pub fn process_image(&self, bytes: &[u8]) -> Result<ImageOutput> {
        self::single::process_image(
            bytes,
            &self.spots,
            &self.classifier,
            &self.annotator,
            self.jpeg_quality,
        )
    }

    /// Run the video pipeline over an arbitrary frame source and sink.
    pub fn process_frames<S, K>(
        &self,
        source: &mut S,
        sink: K,
        on_frame: impl FnMut(FrameTick),
    ) -> Result<VideoOutput>
    where
        S: FrameSource,
        K: FrameSink,
    {
        run_video(
            source,
            sink,
            &self.spots,
            &self.classifier,
            &self.annotator,
            self.sampling,
            on_frame,
        )
    }

    /// Decode an MP4 container, annotate every frame and re-encode it.
    pub fn process_video(&self, bytes: &[u8]) -> Result<VideoOutput> {
        self.process_video_with(bytes, |_| {})
    }

    #[cfg(feature = "video-ffmpeg")]
    pub fn process_video_with(
        &self,
        bytes: &[u8],
        on_frame: impl FnMut(FrameTick),
    ) -> Result<VideoOutput> {
        use crate::video::{FfmpegSink, FfmpegSource};

        let mut source = FfmpegSource::from_bytes(bytes)?;
        let sink = FfmpegSink::new(source.info())?;
        self.process_frames(&mut source, sink, on_frame)
    }

    #[cfg(not(feature = "video-ffmpeg"))]
    pub fn process_video_with(
        &self,
        _bytes: &[u8],
        _on_frame: impl FnMut(FrameTick),
    ) -> Result<VideoOutput> {
        Err(crate::error::PipelineError::DecodeError(
            "video decoding requires the video-ffmpeg feature".to_string(),
        ))
    }
}
