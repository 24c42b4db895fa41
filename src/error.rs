use thiserror::Error;

/// Failure taxonomy for a processing run.
///
/// Every variant aborts the current invocation. Nothing in the core retries,
/// and no partially produced output is returned alongside an error.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Mask could not be read, has no spots, or does not fit the frame.
    #[error("invalid mask: {0}")]
    InvalidMask(String),
    /// Classifier artifact missing or unusable at startup.
    #[error("classifier model unavailable: {0}")]
    ModelUnavailable(String),
    /// A single predict call failed.
    #[error("classification failed: {0}")]
    ClassificationError(String),
    #[error("decode failed: {0}")]
    DecodeError(String),
    #[error("encode failed: {0}")]
    EncodeError(String),
    /// The video container opened but yielded no frames.
    #[error("video contains no frames")]
    EmptyVideo,
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Render an `anyhow` chain into a single-line detail string.
    pub(crate) fn detail(err: &anyhow::Error) -> String {
        format!("{err:#}")
    }
}
