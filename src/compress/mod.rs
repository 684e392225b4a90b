/// Image compression module
///
/// This module handles:
/// - The `Compressor` seam the session talks to
/// - The default JPEG compressor backed by the `image` crate
/// - Running a compression off the UI thread

pub mod jpeg;

use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

use crate::error::CompressError;
use crate::state::data::{Quality, MAX_OUTPUT_HEIGHT, MAX_OUTPUT_WIDTH};

pub use jpeg::JpegCompressor;

/// Parameters for a single compression call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressOptions {
    pub quality: Quality,
    pub max_width: u32,
    pub max_height: u32,
}

impl CompressOptions {
    /// Options with the fixed 800x800 output bounds
    pub fn new(quality: Quality) -> Self {
        Self {
            quality,
            max_width: MAX_OUTPUT_WIDTH,
            max_height: MAX_OUTPUT_HEIGHT,
        }
    }
}

/// Turns encoded image bytes into smaller encoded image bytes
///
/// Implementations are treated as opaque: only success or failure is
/// observable, there is no progress reporting.
pub trait Compressor: Send + Sync {
    fn compress(&self, input: &[u8], options: &CompressOptions) -> Result<Vec<u8>, CompressError>;
}

/// Run a compression on the blocking pool so the UI thread stays responsive
pub async fn run(
    compressor: Arc<dyn Compressor>,
    input: Bytes,
    options: CompressOptions,
) -> Result<Vec<u8>, CompressError> {
    debug!(
        "compressing {} bytes at quality {} (max {}x{})",
        input.len(),
        options.quality,
        options.max_width,
        options.max_height
    );

    tokio::task::spawn_blocking(move || compressor.compress(&input, &options))
        .await
        .map_err(|e| CompressError::Task(e.to_string()))?
}
