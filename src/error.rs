use std::time::Duration;

use thiserror::Error;

/// Failure kinds surfaced by the overlay pipeline.
///
/// None of these stop the detection loop; they end up as log lines or
/// status text on the control surface.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("frame source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("detection failed: {0}")]
    DetectorFailure(String),

    #[error("detection timed out after {0:?}")]
    DetectorTimeout(Duration),

    #[error("{field} out of range: {value}")]
    ConfigurationOutOfRange { field: &'static str, value: String },

    #[error("export failed: {0}")]
    Export(String),
}

impl OverlayError {
    pub fn out_of_range(field: &'static str, value: impl ToString) -> Self {
        Self::ConfigurationOutOfRange {
            field,
            value: value.to_string(),
        }
    }
}
