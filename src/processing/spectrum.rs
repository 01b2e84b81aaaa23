// DominantFrequencyEstimator - peak bin of the magnitude spectrum
//
// Algorithm:
// 1. fs = (L - 1) / (t_last - t_first)
// 2. Full-length FFT of the raw values (no window, no zero padding)
// 3. Single-sided magnitude |X[k]| * 2 / L for k = 1..=L/2
// 4. Arg-max bin k*  ->  f = k* * fs / L, Tb = 1 / f
//
// The DC bin is skipped: a zero-frequency "peak" has no period and would
// collapse both cutoffs to zero.

use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;

use crate::config::ProcessingConfig;
use crate::error::ProcessingError;
use crate::series::Series;

/// Peak of a series' spectrum
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DominantFrequency {
    pub frequency_hz: f64,
    /// Tb, the reciprocal of `frequency_hz`
    pub period_secs: f64,
    pub bin: usize,
    pub magnitude: f64,
    pub sample_rate_hz: f64,
    /// Set when the configured fallback replaced a peakless spectrum
    pub from_fallback: bool,
}

impl DominantFrequency {
    fn from_frequency(
        frequency_hz: f64,
        bin: usize,
        magnitude: f64,
        sample_rate_hz: f64,
        from_fallback: bool,
    ) -> Self {
        Self {
            frequency_hz,
            period_secs: 1.0 / frequency_hz,
            bin,
            magnitude,
            sample_rate_hz,
            from_fallback,
        }
    }
}

/// FFT-based dominant frequency finder
pub struct DominantFrequencyEstimator {
    planner: FftPlanner<f64>,
    min_peak_magnitude: f64,
    fallback_frequency_hz: Option<f64>,
}

impl DominantFrequencyEstimator {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            planner: FftPlanner::new(),
            min_peak_magnitude: config.min_peak_magnitude.max(0.0),
            fallback_frequency_hz: config
                .fallback_frequency_hz
                .filter(|hz| hz.is_finite() && *hz > 0.0),
        }
    }

    /// Single-sided magnitude spectrum, bins 0..=L/2
    pub fn magnitude_spectrum(&mut self, values: &[f64]) -> Vec<f64> {
        let len = values.len();
        if len == 0 {
            return Vec::new();
        }

        let mut buffer: Vec<Complex<f64>> =
            values.iter().map(|&v| Complex::new(v, 0.0)).collect();
        let fft = self.planner.plan_fft_forward(len);
        fft.process(&mut buffer);

        let scale = 2.0 / len as f64;
        buffer[..len / 2 + 1]
            .iter()
            .map(|c| c.norm() * scale)
            .collect()
    }

    /// Find the dominant frequency of `series`; `stage` labels errors and logs
    pub fn estimate(
        &mut self,
        series: &Series,
        stage: &str,
    ) -> Result<DominantFrequency, ProcessingError> {
        let len = series.len();
        let sample_rate = match series.sample_rate() {
            Some(fs) if len >= 2 => fs,
            _ => {
                return Err(ProcessingError::InsufficientData {
                    stage: stage.to_string(),
                    required: 2,
                    actual: len,
                })
            }
        };

        let spectrum = self.magnitude_spectrum(&series.values());
        let (bin, magnitude) = spectrum
            .iter()
            .enumerate()
            .skip(1)
            .fold((0, 0.0_f64), |best, (k, &m)| {
                if m > best.1 {
                    (k, m)
                } else {
                    best
                }
            });

        if bin == 0 || !magnitude.is_finite() || magnitude <= self.min_peak_magnitude {
            if let Some(fallback) = self.fallback_frequency_hz {
                tracing::warn!(
                    "[DominantFrequency] {}: flat spectrum (peak {:.3e}), using fallback {} Hz",
                    stage,
                    magnitude,
                    fallback
                );
                return Ok(DominantFrequency::from_frequency(
                    fallback,
                    0,
                    magnitude,
                    sample_rate,
                    true,
                ));
            }
            return Err(ProcessingError::NoDominantFrequency {
                stage: stage.to_string(),
                peak_magnitude: magnitude,
            });
        }

        let frequency = bin as f64 * sample_rate / len as f64;
        tracing::debug!(
            "[DominantFrequency] {}: fs={:.3} Hz, peak bin {} -> {:.4} Hz (Tb={:.4}s)",
            stage,
            sample_rate,
            bin,
            frequency,
            1.0 / frequency
        );
        Ok(DominantFrequency::from_frequency(
            frequency,
            bin,
            magnitude,
            sample_rate,
            false,
        ))
    }
}
