// Processing error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Processing error code constants
///
/// Error code range: 2001-2006
pub struct ProcessingErrorCodes {}

impl ProcessingErrorCodes {
    /// Too few samples for the requested stage
    pub const INSUFFICIENT_DATA: i32 = 2001;

    /// Spectrum has no usable peak
    pub const NO_DOMINANT_FREQUENCY: i32 = 2002;

    /// Derived band-pass cutoffs are unusable
    pub const INVALID_CUTOFF: i32 = 2003;

    /// Timestamps are not strictly increasing
    pub const NON_MONOTONIC_TIMESTAMPS: i32 = 2004;

    /// Reading or writing a series failed
    pub const IO: i32 = 2005;

    /// Malformed row in a series file
    pub const PARSE: i32 = 2006;
}

/// Log a processing error with structured context
pub fn log_processing_error(err: &ProcessingError, context: &str) {
    error!(
        "Processing error in {}: code={}, component=DisplacementEstimator, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Offline pipeline errors
///
/// Every variant names the pipeline stage (or file) it came from so a failure
/// can be traced back without a debugger.
///
/// Error code range: 2001-2006
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingError {
    /// Stage received fewer samples than it needs
    InsufficientData {
        stage: String,
        required: usize,
        actual: usize,
    },

    /// Flat, zero or otherwise peakless spectrum
    NoDominantFrequency { stage: String, peak_magnitude: f64 },

    /// Cutoffs fall outside (0, nyquist) or cross each other
    InvalidCutoff {
        stage: String,
        lowcut_hz: f64,
        highcut_hz: f64,
        nyquist_hz: f64,
    },

    /// Timestamp at `index` does not advance past its predecessor
    NonMonotonicTimestamps { index: usize, timestamp: f64 },

    /// File-level failure
    Io { path: String, details: String },

    /// Row could not be parsed as `timestamp,value`
    Parse { line: usize, details: String },
}

impl ErrorCode for ProcessingError {
    fn code(&self) -> i32 {
        match self {
            ProcessingError::InsufficientData { .. } => ProcessingErrorCodes::INSUFFICIENT_DATA,
            ProcessingError::NoDominantFrequency { .. } => {
                ProcessingErrorCodes::NO_DOMINANT_FREQUENCY
            }
            ProcessingError::InvalidCutoff { .. } => ProcessingErrorCodes::INVALID_CUTOFF,
            ProcessingError::NonMonotonicTimestamps { .. } => {
                ProcessingErrorCodes::NON_MONOTONIC_TIMESTAMPS
            }
            ProcessingError::Io { .. } => ProcessingErrorCodes::IO,
            ProcessingError::Parse { .. } => ProcessingErrorCodes::PARSE,
        }
    }

    fn message(&self) -> String {
        match self {
            ProcessingError::InsufficientData {
                stage,
                required,
                actual,
            } => format!(
                "Insufficient data for {}: need {} samples, got {}",
                stage, required, actual
            ),
            ProcessingError::NoDominantFrequency {
                stage,
                peak_magnitude,
            } => format!(
                "No dominant frequency in {} (peak magnitude {:.3e})",
                stage, peak_magnitude
            ),
            ProcessingError::InvalidCutoff {
                stage,
                lowcut_hz,
                highcut_hz,
                nyquist_hz,
            } => format!(
                "Invalid cutoff for {}: band {:.4}-{:.4} Hz outside (0, {:.4}) Hz",
                stage, lowcut_hz, highcut_hz, nyquist_hz
            ),
            ProcessingError::NonMonotonicTimestamps { index, timestamp } => format!(
                "Timestamp {} at index {} does not increase",
                timestamp, index
            ),
            ProcessingError::Io { path, details } => {
                format!("I/O error on {}: {}", path, details)
            }
            ProcessingError::Parse { line, details } => {
                format!("Parse error on line {}: {}", line, details)
            }
        }
    }
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ProcessingError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ProcessingError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_error_codes() {
        assert_eq!(
            ProcessingError::InsufficientData {
                stage: "test".to_string(),
                required: 2,
                actual: 1
            }
            .code(),
            ProcessingErrorCodes::INSUFFICIENT_DATA
        );
        assert_eq!(
            ProcessingError::InvalidCutoff {
                stage: "test".to_string(),
                lowcut_hz: 1.0,
                highcut_hz: 60.0,
                nyquist_hz: 50.0
            }
            .code(),
            ProcessingErrorCodes::INVALID_CUTOFF
        );
        assert_eq!(
            ProcessingError::NonMonotonicTimestamps {
                index: 4,
                timestamp: 0.2
            }
            .code(),
            2004
        );
        assert_eq!(
            ProcessingError::Parse {
                line: 1,
                details: "test".to_string()
            }
            .code(),
            2006
        );
    }

    #[test]
    fn test_processing_error_messages() {
        let err = ProcessingError::InsufficientData {
            stage: "integration".to_string(),
            required: 2,
            actual: 1,
        };
        assert_eq!(
            err.message(),
            "Insufficient data for integration: need 2 samples, got 1"
        );

        let err = ProcessingError::InvalidCutoff {
            stage: "acceleration".to_string(),
            lowcut_hz: 3.0,
            highcut_hz: 80.0,
            nyquist_hz: 50.0,
        };
        assert!(err.message().contains("acceleration"));
        assert!(err.message().contains("80.0000"));
    }

    #[test]
    fn test_processing_error_display() {
        let err = ProcessingError::Io {
            path: "results.csv".to_string(),
            details: "denied".to_string(),
        };
        let display = format!("{}", err);
        assert!(display.contains("ProcessingError"));
        assert!(display.contains("2005"));
    }
}
