/// Error types for ImgCrush
///
/// Every error here is recovered locally: the UI turns it into a notice
/// or a log line and the session keeps running.

use std::path::PathBuf;
use thiserror::Error;

use crate::state::session::{Phase, Transition};

/// Failures reported by a [`Compressor`](crate::compress::Compressor)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompressError {
    /// Nothing to compress
    #[error("input image is empty")]
    EmptyInput,

    /// The bytes could not be decoded as an image
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// The re-encode step failed
    #[error("failed to encode image: {0}")]
    Encode(String),

    /// The background task panicked or was cancelled by the runtime
    #[error("compression task failed: {0}")]
    Task(String),
}

/// Rejections from the compression session state machine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// `compress()` was invoked before an image was selected
    #[error("no source image selected")]
    MissingInput,

    /// A compression is already in flight
    #[error("a compression is already running")]
    Busy,

    /// The transition table has no edge for this pair
    #[error("illegal transition {transition:?} from {from:?}")]
    IllegalTransition { from: Phase, transition: Transition },

    /// The completion did not belong to the compression in flight
    #[error("stale completion for job {got}, expected {expected:?}")]
    StaleCompletion { got: u64, expected: Option<u64> },
}

/// Problems reading the optional config file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<image::ImageError> for CompressError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Decoding(e) => Self::Decode(e.to_string()),
            image::ImageError::Unsupported(e) => Self::Decode(e.to_string()),
            other => Self::Encode(other.to_string()),
        }
    }
}
