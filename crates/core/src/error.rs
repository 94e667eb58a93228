//! Error and status types for the measurement engine

use std::fmt;

/// Failures raised by measurement operations
///
/// All of these are recoverable: the offending gesture is aborted or left
/// open and the user retries with corrected input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeasureError {
    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),

    #[error("invalid polygon: {reason}")]
    InvalidPolygon { reason: String },

    #[error("page {page} has no scale; calibrate it first")]
    MissingScale { page: u16 },

    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u16, page_count: u16 },

    #[error("page render failed: {0}")]
    Render(String),
}

/// Result alias for measurement operations
pub type MeasureResult<T> = Result<T, MeasureError>;

/// Severity of a user-facing status message
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Short status line produced by an interaction
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StatusMessage {
    pub severity: Severity,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self { severity: Severity::Info, text: text.into() }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self { severity: Severity::Success, text: text.into() }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { severity: Severity::Error, text: text.into() }
    }
}

impl From<&MeasureError> for StatusMessage {
    fn from(error: &MeasureError) -> Self {
        match error {
            MeasureError::InvalidPolygon { .. } | MeasureError::MissingScale { .. } => {
                StatusMessage::warning(error.to_string())
            }
            _ => StatusMessage::error(error.to_string()),
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "[{label}] {}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = MeasureError::PageOutOfRange { page: 4, page_count: 2 };
        assert_eq!(err.to_string(), "page 4 out of range (page_count=2)");

        let err = MeasureError::InvalidPolygon { reason: "area is too small".into() };
        assert_eq!(err.to_string(), "invalid polygon: area is too small");
    }

    #[test]
    fn test_status_from_error_severity() {
        let status = StatusMessage::from(&MeasureError::MissingScale { page: 1 });
        assert_eq!(status.severity, Severity::Warning);

        let status = StatusMessage::from(&MeasureError::InvalidCalibration("zero".into()));
        assert_eq!(status.severity, Severity::Error);
        assert_eq!(status.to_string(), "[error] invalid calibration: zero");
    }
}
