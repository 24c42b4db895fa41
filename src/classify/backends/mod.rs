pub mod linear;
pub mod threshold;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use linear::LinearBackend;
pub use threshold::ThresholdBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
