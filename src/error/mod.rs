// Error types for the shake capture crate
//
// This module defines custom error types for the capture session and the
// offline displacement pipeline, providing structured error handling with
// numeric error codes suitable for process exit codes and JSON reports.

mod capture;
mod processing;

pub use capture::{log_capture_error, CaptureError, CaptureErrorCodes};
pub use processing::{log_processing_error, ProcessingError, ProcessingErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the CLI and library boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
