//! Video driver: runs the change scheduler over every frame in order,
//! annotates every frame with the last known statuses and streams the
//! result into a sink.

use serde::Serialize;

use crate::classify::Classifier;
use crate::error::{PipelineError, Result};
use crate::overlay::{Annotator, Summary};
use crate::scheduler::{ChangeScheduler, SamplingConfig, Tick};
use crate::spot::{ensure_spots_fit, ParkingSpot};
use crate::video::{FrameSink, FrameSource};

/// Per-frame progress notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTick {
    pub index: u64,
    pub sampled: bool,
    /// Spots reclassified on this frame (0 when not sampled).
    pub reclassified: usize,
}

/// Totals for a finished video run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VideoReport {
    pub frames: u64,
    pub samples: u64,
    pub classifications: u64,
    /// Counts baked into the last frame's overlay.
    pub final_summary: Summary,
}

#[derive(Clone, Debug)]
pub struct VideoOutput {
    pub bytes: Vec<u8>,
    pub report: VideoReport,
}

/// Drive `source` through scheduling and annotation into `sink`.
///
/// The sink is only finished when every frame succeeded; on error it is
/// dropped along with any partial output.
pub fn run_video<S, K>(
    source: &mut S,
    mut sink: K,
    spots: &[ParkingSpot],
    classifier: &Classifier,
    annotator: &Annotator,
    sampling: SamplingConfig,
    mut on_frame: impl FnMut(FrameTick),
) -> Result<VideoOutput>
where
    S: FrameSource,
    K: FrameSink,
{
    let info = source.info();
    ensure_spots_fit(spots, info.width, info.height)?;

    let mut scheduler = ChangeScheduler::new(spots.to_vec(), sampling);
    let mut final_summary = Summary::default();

    while let Some(mut frame) = source.next_frame()? {
        if frame.dimensions() != (info.width, info.height) {
            return Err(PipelineError::DecodeError(format!(
                "frame {} is {:?}, stream is {}x{}",
                scheduler.stats().frames,
                frame.dimensions(),
                info.width,
                info.height
            )));
        }

        let index = scheduler.stats().frames;
        let tick = scheduler.observe(&frame, classifier)?;
        let statuses = scheduler.current_statuses()?;
        final_summary = annotator.annotate(&mut frame, scheduler.spots(), statuses);
        sink.push(&frame)?;

        on_frame(match tick {
            Tick::Carried => FrameTick {
                index,
                sampled: false,
                reclassified: 0,
            },
            Tick::Sampled { reclassified } => FrameTick {
                index,
                sampled: true,
                reclassified: reclassified.len(),
            },
        });
    }

    let stats = scheduler.stats();
    if stats.frames == 0 {
        return Err(PipelineError::EmptyVideo);
    }

    let bytes = sink.finish()?;
    let report = VideoReport {
        frames: stats.frames,
        samples: stats.samples,
        classifications: stats.classifications,
        final_summary,
    };
    log::info!(
        "video processed: {} frames, {} samples, {} classifications",
        report.frames,
        report.samples,
        report.classifications
    );
    Ok(VideoOutput { bytes, report })
}
