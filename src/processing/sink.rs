//! Destinations for a finished displacement estimate.

use crate::error::ProcessingError;
use crate::processing::pipeline::DisplacementReport;

/// Receives the pipeline result exactly once per run
pub trait ResultSink {
    fn publish(&mut self, report: &DisplacementReport) -> Result<(), ProcessingError>;
}

/// Remote results endpoint
///
/// Posting is not wired up yet; the sink records what it would have sent and
/// always succeeds.
#[derive(Debug, Clone, Default)]
pub struct EndpointSink {
    endpoint: Option<String>,
    published: Vec<f64>,
}

impl EndpointSink {
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            endpoint,
            published: Vec::new(),
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Final displacements handed to this sink so far
    pub fn published(&self) -> &[f64] {
        &self.published
    }
}

impl ResultSink for EndpointSink {
    fn publish(&mut self, report: &DisplacementReport) -> Result<(), ProcessingError> {
        match &self.endpoint {
            Some(endpoint) => tracing::info!(
                "[EndpointSink] Would post final displacement {:.6e} to {}",
                report.final_displacement,
                endpoint
            ),
            None => tracing::debug!(
                "[EndpointSink] No endpoint configured, final displacement {:.6e}",
                report.final_displacement
            ),
        }
        self.published.push(report.final_displacement);
        Ok(())
    }
}
