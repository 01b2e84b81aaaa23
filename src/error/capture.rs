// Capture error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Capture error code constants
///
/// Single source of truth for the numeric codes reported by the CLI.
///
/// Error code range: 1001-1005
pub struct CaptureErrorCodes {}

impl CaptureErrorCodes {
    /// Sample source could not produce a reading
    pub const SOURCE_UNAVAILABLE: i32 = 1001;

    /// Not enough readings to establish the baseline
    pub const INSUFFICIENT_SAMPLES: i32 = 1002;

    /// Storage write failed
    pub const IO: i32 = 1003;

    /// Capture configuration rejected
    pub const INVALID_CONFIG: i32 = 1004;

    /// Session already ran to completion
    pub const SESSION_ENDED: i32 = 1005;
}

/// Log a capture error with structured context
///
/// This function logs capture errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_capture_error(err: &CaptureError, context: &str) {
    error!(
        "Capture error in {}: code={}, component=CaptureSession, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Capture-related errors
///
/// These errors cover the live side of the crate: reading the sample source,
/// establishing the baseline and persisting rows.
///
/// Error code range: 1001-1005
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// Sample source failed on a read (hardware gone, replay exhausted)
    SourceUnavailable {
        channel: u8,
        sample_index: u64,
        reason: String,
    },

    /// Source ran dry before the baseline window was filled
    InsufficientSamples { required: usize, collected: usize },

    /// Storage write failed
    Io { context: String, details: String },

    /// Configuration value out of range
    InvalidConfig { reason: String },

    /// Session already ended; it cannot be run twice
    SessionEnded,
}

impl ErrorCode for CaptureError {
    fn code(&self) -> i32 {
        match self {
            CaptureError::SourceUnavailable { .. } => CaptureErrorCodes::SOURCE_UNAVAILABLE,
            CaptureError::InsufficientSamples { .. } => CaptureErrorCodes::INSUFFICIENT_SAMPLES,
            CaptureError::Io { .. } => CaptureErrorCodes::IO,
            CaptureError::InvalidConfig { .. } => CaptureErrorCodes::INVALID_CONFIG,
            CaptureError::SessionEnded => CaptureErrorCodes::SESSION_ENDED,
        }
    }

    fn message(&self) -> String {
        match self {
            CaptureError::SourceUnavailable {
                channel,
                sample_index,
                reason,
            } => format!(
                "Sample source on channel {} unavailable at sample {}: {}",
                channel, sample_index, reason
            ),
            CaptureError::InsufficientSamples {
                required,
                collected,
            } => {
                format!(
                    "Insufficient baseline samples: need {}, got {}",
                    required, collected
                )
            }
            CaptureError::Io { context, details } => {
                format!("Storage error while {}: {}", context, details)
            }
            CaptureError::InvalidConfig { reason } => {
                format!("Invalid capture configuration: {}", reason)
            }
            CaptureError::SessionEnded => "Capture session already ended".to_string(),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CaptureError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CaptureError {}

/// Convert from std::io::Error to CaptureError
impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::Io {
            context: "writing capture rows".to_string(),
            details: err.to_string(),
        }
    }
}
