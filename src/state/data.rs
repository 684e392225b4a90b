/// Shared data structures for the compression session
///
/// These structs represent the data model that flows between
/// the session state machine and the UI layer.

use chrono::{DateTime, Local};
use tracing::warn;

use super::handle::{DisplayHandle, Displayable};

/// Fixed output bounds passed to every compression (policy constant)
pub const MAX_OUTPUT_WIDTH: u32 = 800;
pub const MAX_OUTPUT_HEIGHT: u32 = 800;

/// Suffix appended to the stripped source name
const OUTPUT_SUFFIX: &str = "_compressed.jpg";

/// Compression quality in [0.1, 1.0], stored in tenths
///
/// Construction clamps and snaps to the 0.1 step, so every value
/// of this type is a legal slider position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u8);

impl Quality {
    pub const MIN: Quality = Quality(1);
    pub const MAX: Quality = Quality(10);

    /// Build from a slider value, clamping anything out of range
    pub fn new(value: f32) -> Self {
        if !value.is_finite() {
            warn!("non-finite quality {}, using default", value);
            return Self::default();
        }
        let clamped = value.clamp(Self::MIN.value(), Self::MAX.value());
        if clamped != value {
            warn!("quality {} out of range, clamped to {}", value, clamped);
        }
        Quality((clamped * 10.0).round() as u8)
    }

    /// The quality as a fraction (0.1 ..= 1.0)
    pub fn value(self) -> f32 {
        f32::from(self.0) / 10.0
    }

    /// The same quality on the 1-100 scale JPEG encoders use
    pub fn percent(self) -> u8 {
        self.0 * 10
    }

    /// Every legal quality, lowest first
    #[cfg(test)]
    pub fn all() -> impl Iterator<Item = Quality> {
        (Self::MIN.0..=Self::MAX.0).map(Quality)
    }
}

impl Default for Quality {
    fn default() -> Self {
        Quality(8)
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}", self.value())
    }
}

/// The user-selected image
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// File name as picked (e.g., "holiday.png")
    pub name: String,
    /// Size of the picked file in bytes
    pub size: u64,
    /// Suggested name for the compressed download
    pub output_name: String,
    /// Bytes as loaded from disk
    pub handle: DisplayHandle,
}

impl Displayable for SourceImage {
    fn display_handle(&self) -> &DisplayHandle {
        &self.handle
    }
}

/// Outcome of the last successful compression of the current source
#[derive(Debug, Clone)]
pub struct CompressionResult {
    /// Name offered when downloading
    pub output_name: String,
    pub original_size: u64,
    pub compressed_size: u64,
    /// `None` when the original size was zero
    pub percent_saved: Option<f64>,
    /// Quality the result was produced with
    pub quality: Quality,
    /// Encoded output
    pub handle: DisplayHandle,
}

impl Displayable for CompressionResult {
    fn display_handle(&self) -> &DisplayHandle {
        &self.handle
    }
}

/// Immutable record of one past successful compression
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub name: String,
    pub percent_saved: Option<f64>,
    pub compressed_size: u64,
    pub completed_at: DateTime<Local>,
    pub handle: DisplayHandle,
}

impl HistoryEntry {
    pub fn from_result(result: &CompressionResult) -> Self {
        Self {
            name: result.output_name.clone(),
            percent_saved: result.percent_saved,
            compressed_size: result.compressed_size,
            completed_at: Local::now(),
            handle: result.handle.clone(),
        }
    }
}

/// Percentage of bytes saved, rounded to one decimal
///
/// Returns `None` for an empty original instead of NaN or infinity.
/// The value is negative when the output grew.
pub fn percent_saved(original: u64, compressed: u64) -> Option<f64> {
    if original == 0 {
        return None;
    }
    let saved = (original as f64 - compressed as f64) / original as f64 * 100.0;
    Some((saved * 10.0).round() / 10.0)
}

/// Derive the download name: drop the last extension, append `_compressed.jpg`
///
/// Only a trailing `.xyz` without further dots or slashes counts as an
/// extension, so "a.tar.gz" keeps "a.tar" and "trailing." keeps its dot.
pub fn output_name(file_name: &str) -> String {
    let stem = match file_name.rfind('.') {
        Some(dot) => {
            let ext = &file_name[dot + 1..];
            if !ext.is_empty() && !ext.contains('/') {
                &file_name[..dot]
            } else {
                file_name
            }
        }
        None => file_name,
    };
    format!("{}{}", stem, OUTPUT_SUFFIX)
}

/// Render a byte count as kilobytes with two decimals
pub fn format_kb(bytes: u64) -> String {
    format!("{:.2} KB", bytes as f64 / 1024.0)
}

/// Render a saved percentage for display
pub fn format_percent(percent: Option<f64>) -> String {
    match percent {
        Some(p) => format!("{:.1}%", p),
        None => "n/a".to_string(),
    }
}
