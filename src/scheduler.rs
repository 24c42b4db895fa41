//! Sampling and change-detection scheduler.
//!
//! Once every `step` frames the scheduler decides which spots to reclassify.
//! The first sample classifies every spot. Later samples score each spot
//! against the previous sampled frame and only reclassify spots whose score
//! relative to this sample's largest score exceeds `change_threshold`.
//! Frames between samples reuse the last known status vector unchanged.

use image::RgbImage;

use crate::classify::{Classifier, SpotStatus};
use crate::diff::spot_diff;
use crate::error::{PipelineError, Result};
use crate::spot::ParkingSpot;

pub const DEFAULT_STEP: u32 = 30;
pub const DEFAULT_CHANGE_THRESHOLD: f64 = 0.4;

/// Sampling parameters for a video run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplingConfig {
    /// Sampling period in frames. `ChangeScheduler` treats 0 as 1 (sample
    /// every frame); `ParkwatchConfig::validate` rejects 0 from config.
    pub step: u32,
    /// Relative change cut; a spot is reclassified when `diff / max_diff`
    /// is strictly greater than this.
    pub change_threshold: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            change_threshold: DEFAULT_CHANGE_THRESHOLD,
        }
    }
}

/// Scheduler state across sample boundaries.
#[derive(Debug)]
pub enum SamplerState {
    /// No frame has been sampled yet; the next sample is a full pass.
    NoPriorSample,
    /// At least one sample happened. Every spot has a status.
    HasPriorSample {
        previous: RgbImage,
        statuses: Vec<SpotStatus>,
    },
}

/// What happened on one observed frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Not a sample boundary; statuses carried over.
    Carried,
    /// Sample boundary; the listed spot indices were reclassified.
    Sampled { reclassified: Vec<usize> },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub frames: u64,
    pub samples: u64,
    pub classifications: u64,
}

/// Spots whose relative change exceeds `threshold`, in index order.
///
/// When the largest score is zero nothing changed anywhere and nothing is
/// selected.
pub fn select_changed(diffs: &[f64], threshold: f64) -> Vec<usize> {
    let max_diff = diffs.iter().copied().fold(0.0_f64, f64::max);
    if max_diff <= 0.0 {
        return Vec::new();
    }
    diffs
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d / max_diff > threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Per-run scheduler. One instance per video; never shared between runs.
#[derive(Debug)]
pub struct ChangeScheduler {
    spots: Vec<ParkingSpot>,
    config: SamplingConfig,
    state: SamplerState,
    diffs: Vec<f64>,
    frame_index: u64,
    stats: SchedulerStats,
}

impl ChangeScheduler {
    pub fn new(spots: Vec<ParkingSpot>, config: SamplingConfig) -> Self {
        let diffs = vec![0.0; spots.len()];
        Self {
            spots,
            config: SamplingConfig {
                step: config.step.max(1),
                ..config
            },
            state: SamplerState::NoPriorSample,
            diffs,
            frame_index: 0,
            stats: SchedulerStats::default(),
        }
    }

    pub fn spots(&self) -> &[ParkingSpot] {
        &self.spots
    }

    pub fn state(&self) -> &SamplerState {
        &self.state
    }

    /// Diff scores from the most recent non-initial sample.
    pub fn diffs(&self) -> &[f64] {
        &self.diffs
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Last known status vector, once the first sample has run.
    pub fn statuses(&self) -> Option<&[SpotStatus]> {
        match &self.state {
            SamplerState::NoPriorSample => None,
            SamplerState::HasPriorSample { statuses, .. } => Some(statuses),
        }
    }

    /// Feed the next frame in order.
    pub fn observe(&mut self, frame: &RgbImage, classifier: &Classifier) -> Result<Tick> {
        let index = self.frame_index;
        self.frame_index += 1;
        self.stats.frames += 1;

        if index % u64::from(self.config.step) != 0 {
            return Ok(Tick::Carried);
        }
        self.stats.samples += 1;

        let reclassified = match &mut self.state {
            SamplerState::NoPriorSample => {
                let statuses = self
                    .spots
                    .iter()
                    .map(|spot| classifier.classify(&spot.crop(frame)))
                    .collect::<Result<Vec<_>>>()?;
                self.stats.classifications += statuses.len() as u64;
                log::debug!(
                    "frame {}: initial sample classified {} spots",
                    index,
                    statuses.len()
                );
                self.state = SamplerState::HasPriorSample {
                    previous: frame.clone(),
                    statuses,
                };
                (0..self.spots.len()).collect()
            }
            SamplerState::HasPriorSample { previous, statuses } => {
                for (diff, spot) in self.diffs.iter_mut().zip(&self.spots) {
                    *diff = spot_diff(frame, previous, spot);
                }
                let selected = select_changed(&self.diffs, self.config.change_threshold);

                let mut updates = Vec::with_capacity(selected.len());
                for &i in &selected {
                    updates.push(classifier.classify(&self.spots[i].crop(frame))?);
                }
                for (&i, status) in selected.iter().zip(updates) {
                    statuses[i] = status;
                }
                self.stats.classifications += selected.len() as u64;

                let max_diff = self.diffs.iter().copied().fold(0.0_f64, f64::max);
                log::debug!(
                    "frame {}: reclassified {}/{} spots (max diff {:.3})",
                    index,
                    selected.len(),
                    self.spots.len(),
                    max_diff
                );

                previous.clone_from(frame);
                selected
            }
        };

        Ok(Tick::Sampled { reclassified })
    }

    /// Status vector for rendering the frame just observed.
    pub(crate) fn current_statuses(&self) -> Result<&[SpotStatus]> {
        self.statuses().ok_or_else(|| {
            PipelineError::ClassificationError("no sample has been classified yet".to_string())
        })
    }
}
