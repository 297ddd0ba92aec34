// src/error.rs
use std::fmt;

use crate::host::PageElement;

/// Failures the crawl, claim and report code can run into. None of them is fatal
/// to the host; each is either retried, recorded against a plot, or shown inline.
#[derive(Debug)]
pub enum HelperError {
    /// Expected page element did not appear within its wait bound.
    PageNotReady { element: PageElement, waited_ms: u64 },
    /// Fewer pump rows than the dashboard said the plot has.
    ExtractionShortfall { found: u32, expected: u32 },
    /// Retries exhausted on one plot.
    PlotFailed { plot_id: String, reason: String },
    UserDeclined,
    /// A persisted blob failed to parse or lacks a required field.
    CorruptState { key: String, reason: String },
    MissingSnapshotField(&'static str),
    NoReport,
    Storage(std::io::Error),
}

impl fmt::Display for HelperError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HelperError::PageNotReady { element, waited_ms } => {
                write!(f, "Timeout waiting for {:?} after {} ms", element, waited_ms)
            }
            HelperError::ExtractionShortfall { found, expected } => {
                write!(f, "Found {} of {} expected pumps", found, expected)
            }
            HelperError::PlotFailed { plot_id, reason } => write!(f, "Plot {} failed: {}", plot_id, reason),
            HelperError::UserDeclined => write!(f, "Cancelled by user"),
            HelperError::CorruptState { key, reason } => write!(f, "Invalid stored data in {}: {}", key, reason),
            HelperError::MissingSnapshotField(field) => write!(f, "Missing critical dashboard data: {}", field),
            HelperError::NoReport => write!(f, "No previous analysis found. Please run a full analysis first."),
            HelperError::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for HelperError {}

impl From<std::io::Error> for HelperError {
    fn from(e: std::io::Error) -> Self {
        HelperError::Storage(e)
    }
}
