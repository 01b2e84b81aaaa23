// BaselineEstimator - quiescent mean of the channel
//
// Averages the first N readings of a session. The result centres every later
// reading and is never updated once recording starts.

use crate::error::CaptureError;

/// Batch mean over a fixed number of quiet readings
#[derive(Debug, Clone, Copy)]
pub struct BaselineEstimator {
    required: usize,
}

impl BaselineEstimator {
    pub fn new(required: usize) -> Self {
        Self { required }
    }

    pub fn required(&self) -> usize {
        self.required
    }

    /// Pull `required` readings from `sample` and return their mean
    ///
    /// A source that runs dry early yields `InsufficientSamples`; any other
    /// error is passed through untouched.
    pub fn establish<F>(&self, mut sample: F) -> Result<f64, CaptureError>
    where
        F: FnMut() -> Result<f64, CaptureError>,
    {
        if self.required == 0 {
            return Err(CaptureError::InsufficientSamples {
                required: 0,
                collected: 0,
            });
        }

        let mut mean = 0.0;
        for collected in 0..self.required {
            let value = match sample() {
                Ok(value) => value,
                Err(CaptureError::SourceUnavailable { reason, .. }) => {
                    tracing::warn!(
                        "[BaselineEstimator] Source ran dry after {} of {} readings: {}",
                        collected,
                        self.required,
                        reason
                    );
                    return Err(CaptureError::InsufficientSamples {
                        required: self.required,
                        collected,
                    });
                }
                Err(err) => return Err(err),
            };
            // Incremental mean keeps precision for long windows of large ADC counts
            mean += (value - mean) / (collected + 1) as f64;
        }

        tracing::info!(
            "[BaselineEstimator] Baseline established: mean={:.4} over {} readings",
            mean,
            self.required
        );
        Ok(mean)
    }
}
