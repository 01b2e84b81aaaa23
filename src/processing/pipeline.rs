// DisplacementEstimator - acceleration to displacement
//
// acceleration -> band-pass -> integrate -> velocity
//              -> band-pass -> integrate -> displacement
//
// Each band-pass stage re-estimates the dominant frequency of its own input,
// so the velocity stage is tuned to the velocity spectrum rather than reusing
// the acceleration cutoffs.

use serde::Serialize;

use crate::config::ProcessingConfig;
use crate::error::{log_processing_error, ErrorCode, ProcessingError};
use crate::processing::bandpass::AdaptiveBandpassFilter;
use crate::processing::integrate::TrapezoidalIntegrator;
use crate::processing::sink::ResultSink;
use crate::processing::spectrum::{DominantFrequency, DominantFrequencyEstimator};
use crate::series::Series;

pub const ACCELERATION_STAGE: &str = "acceleration";
pub const VELOCITY_STAGE: &str = "velocity";

/// What one filter stage saw and did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    pub stage: String,
    pub dominant: DominantFrequency,
    pub lowcut_hz: f64,
    pub highcut_hz: f64,
}

/// Pipeline output
#[derive(Debug, Clone, Serialize)]
pub struct DisplacementReport {
    /// Last value of the displacement series
    pub final_displacement: f64,
    pub peak_displacement: f64,
    pub stages: Vec<StageSummary>,
    #[serde(skip)]
    pub velocity: Series,
    #[serde(skip)]
    pub displacement: Series,
}

pub struct DisplacementEstimator {
    spectrum: DominantFrequencyEstimator,
    bandpass: AdaptiveBandpassFilter,
}

impl DisplacementEstimator {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            spectrum: DominantFrequencyEstimator::new(config),
            bandpass: AdaptiveBandpassFilter::new(config),
        }
    }

    /// Run the pipeline over an acceleration series
    pub fn estimate(
        &mut self,
        acceleration: &Series,
    ) -> Result<DisplacementReport, ProcessingError> {
        self.run(acceleration)
            .inspect_err(|err| log_processing_error(err, "estimate"))
    }

    /// Run the pipeline and hand the result to `sink`
    ///
    /// A failing sink is logged; the report is returned either way.
    pub fn estimate_and_publish(
        &mut self,
        acceleration: &Series,
        sink: &mut dyn ResultSink,
    ) -> Result<DisplacementReport, ProcessingError> {
        let report = self.estimate(acceleration)?;
        if let Err(err) = sink.publish(&report) {
            tracing::warn!(
                "[DisplacementEstimator] Result sink failed (code {}): {}",
                err.code(),
                err.message()
            );
        }
        Ok(report)
    }

    fn run(&mut self, acceleration: &Series) -> Result<DisplacementReport, ProcessingError> {
        tracing::info!(
            "[DisplacementEstimator] Processing {} samples over {:.3}s",
            acceleration.len(),
            acceleration.duration()
        );

        let (filtered_acceleration, acceleration_stage) =
            self.filter_stage(acceleration, ACCELERATION_STAGE)?;
        let velocity =
            TrapezoidalIntegrator::integrate(&filtered_acceleration, ACCELERATION_STAGE)?;

        let (filtered_velocity, velocity_stage) = self.filter_stage(&velocity, VELOCITY_STAGE)?;
        let displacement = TrapezoidalIntegrator::integrate(&filtered_velocity, VELOCITY_STAGE)?;

        let final_displacement = displacement.last().map(|s| s.value).unwrap_or_default();
        let peak_displacement = displacement.peak_abs();
        tracing::info!(
            "[DisplacementEstimator] Final displacement {:.6e}, peak {:.6e}",
            final_displacement,
            peak_displacement
        );

        Ok(DisplacementReport {
            final_displacement,
            peak_displacement,
            stages: vec![acceleration_stage, velocity_stage],
            velocity,
            displacement,
        })
    }

    fn filter_stage(
        &mut self,
        input: &Series,
        stage: &str,
    ) -> Result<(Series, StageSummary), ProcessingError> {
        let dominant = self.spectrum.estimate(input, stage)?;
        let outcome = self.bandpass.apply(input, &dominant, stage)?;
        tracing::info!(
            "[DisplacementEstimator] {} stage: dominant {:.4} Hz, band {:.4}-{:.4} Hz",
            stage,
            dominant.frequency_hz,
            outcome.lowcut_hz,
            outcome.highcut_hz
        );
        let summary = StageSummary {
            stage: stage.to_string(),
            dominant,
            lowcut_hz: outcome.lowcut_hz,
            highcut_hz: outcome.highcut_hz,
        };
        Ok((outcome.series, summary))
    }
}
