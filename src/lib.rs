// Shake Capture Core - vibration capture and displacement estimation
// Triggered single-channel recording plus an offline filter/integrate pipeline

// Module declarations
pub mod capture;
pub mod config;
pub mod error;
pub mod processing;
pub mod series;

// Re-exports for convenience
pub use capture::{
    CaptureReport, CaptureSession, Clock, CsvSampleSink, ReplaySource, SampleSink,
    SampleSource, StopReason, SyntheticSource, SyntheticSpec, SystemClock,
};
pub use config::{AppConfig, CaptureConfig, ProcessingConfig};
pub use error::{CaptureError, ErrorCode, ProcessingError};
pub use processing::{DisplacementEstimator, DisplacementReport, EndpointSink, ResultSink};
pub use series::{Sample, Series};
