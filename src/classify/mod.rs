//! Occupancy classification.
//!
//! The pretrained classifier is consumed as an opaque predict contract: a
//! crop goes in, `SpotStatus` comes out. Backends only ever see the flattened
//! feature vector; crop validation and feature extraction happen in the
//! `Classifier` service so every backend is fed identically.

mod backend;
mod backends;
mod features;
mod service;

pub use backend::{OccupancyBackend, SpotStatus};
pub use backends::{LinearBackend, ThresholdBackend};
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use features::{patch_features, FEATURE_LEN, PATCH_SIZE};
pub use service::{BackendKind, Classifier, ClassifierSettings};
