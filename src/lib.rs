//! Parking lot occupancy monitor.
//!
//! Reports, per image or per video, how many marked parking spots are free
//! versus occupied for a fixed camera.
//!
//! # Pipeline
//!
//! 1. **Spot extraction**: connected components of a binary mask become spot
//!    rectangles, in label order.
//! 2. **Classification**: each spot crop is resized to a small patch and fed
//!    to a pretrained binary classifier (empty / occupied).
//! 3. **Change-gated sampling** (video only): every `step` frames, spots are
//!    scored against the previous sample and only those whose change is large
//!    relative to this sample's largest change are reclassified.
//! 4. **Annotation**: status boxes and a summary panel are drawn on every
//!    output frame, sampled or not.
//!
//! # Module Structure
//!
//! - `spot`: Mask loading and spot extraction
//! - `classify`: Classifier service and backends (tract, linear, threshold)
//! - `diff`: Per-spot change score
//! - `scheduler`: Sampling state machine
//! - `overlay`: Annotation and summary counts
//! - `video`: Frame sources and sinks (in-memory, FFmpeg)
//! - `pipeline`: Single-image and video drivers
//! - `config`: File + environment configuration

pub mod classify;
pub mod config;
pub mod diff;
pub mod error;
pub mod overlay;
pub mod pipeline;
pub mod scheduler;
pub mod spot;
pub mod ui;
pub mod video;

pub use classify::{BackendKind, Classifier, ClassifierSettings, OccupancyBackend, SpotStatus};
pub use config::ParkwatchConfig;
pub use error::{PipelineError, Result};
pub use overlay::{Annotator, OverlayStyle, Summary};
pub use pipeline::{FrameTick, ImageOutput, ParkingPipeline, VideoOutput, VideoReport};
pub use scheduler::{ChangeScheduler, SamplerState, SamplingConfig, Tick};
pub use spot::{extract_spots, load_mask, ParkingSpot};
pub use video::{FrameSink, FrameSource, MemorySink, MemorySource, VideoInfo};
