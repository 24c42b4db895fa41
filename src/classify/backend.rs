use anyhow::Result;
use serde::Serialize;

/// Occupancy label for a single spot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpotStatus {
    Empty,
    Occupied,
}

impl SpotStatus {
    /// Map a raw model label. Label 0 is the "empty" class.
    pub fn from_label(label: i64) -> Self {
        if label == 0 {
            SpotStatus::Empty
        } else {
            SpotStatus::Occupied
        }
    }

    pub fn is_empty(self) -> bool {
        matches!(self, SpotStatus::Empty)
    }
}

/// Binary occupancy model over a flattened patch feature vector.
///
/// Implementations must be deterministic and free of side effects: the same
/// features always produce the same status. Loading happens in the
/// constructor; `predict` must never fall back to a default label on failure.
pub trait OccupancyBackend: Send + Sync {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Classify one patch.
    fn predict(&self, features: &[f32]) -> Result<SpotStatus>;
}
