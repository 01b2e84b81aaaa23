// TrapezoidalIntegrator - cumulative trapezoid rule on irregular timestamps
//
//   y[0] = 0
//   y[i] = y[i-1] + (t[i] - t[i-1]) * (x[i] + x[i-1]) / 2
//
// The output keeps the input timestamps. No detrending or DC removal happens
// here; the band-pass stages around the integrator handle drift.

use crate::error::ProcessingError;
use crate::series::Series;

pub struct TrapezoidalIntegrator;

impl TrapezoidalIntegrator {
    /// Running integral of `series`; `stage` labels the error for short input
    pub fn integrate(series: &Series, stage: &str) -> Result<Series, ProcessingError> {
        if series.len() < 2 {
            return Err(ProcessingError::InsufficientData {
                stage: stage.to_string(),
                required: 2,
                actual: series.len(),
            });
        }

        let samples = series.samples();
        let mut integral = Vec::with_capacity(samples.len());
        let mut running = 0.0;
        integral.push(running);
        for pair in samples.windows(2) {
            let dt = pair[1].timestamp - pair[0].timestamp;
            running += dt * (pair[1].value + pair[0].value) / 2.0;
            integral.push(running);
        }

        Ok(series.with_values(integral))
    }
}
