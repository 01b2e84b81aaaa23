// AdaptiveBandpassFilter - Butterworth band-pass centred on the dominant frequency
//
// Cutoffs follow the dominant period Tb of the series being filtered:
//   lowcut  = lowcut_factor  / Tb   (0.3 / Tb by default)
//   highcut = highcut_factor / Tb   (8 / Tb by default)
//
// Design path (analog prototype -> band-pass -> bilinear):
// 1. Butterworth prototype poles p_k on the unit circle, left half plane
// 2. Prewarp both edges: w = 2 fs tan(pi f / fs)
// 3. Low-pass to band-pass: each p_k splits into a +- sqrt(a^2 - w0^2), a = p_k bw / 2
// 4. Bilinear map z = (2fs + s) / (2fs - s); N zeros at z = +1 and N at z = -1
// 5. Conjugate pole pairs become second-order sections, numerator 1 - z^-2
//
// Filtering is a single causal forward pass over the cascade.

use std::f64::consts::PI;

use rustfft::num_complex::Complex64;
use serde::Serialize;

use crate::config::ProcessingConfig;
use crate::error::ProcessingError;
use crate::processing::spectrum::DominantFrequency;
use crate::series::Series;

/// Highest supported prototype order
pub const MAX_FILTER_ORDER: usize = 10;

/// Second-order section, Direct Form II Transposed
///
/// H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)
#[derive(Debug, Clone, PartialEq)]
pub struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
    state: [f64; 2],
}

impl Biquad {
    pub fn new(b: [f64; 3], a: [f64; 2]) -> Self {
        Self {
            b,
            a,
            state: [0.0; 2],
        }
    }

    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b[0] * input + self.state[0];
        self.state[0] = self.b[1] * input - self.a[0] * output + self.state[1];
        self.state[1] = self.b[2] * input - self.a[1] * output;
        output
    }

    pub fn reset(&mut self) {
        self.state = [0.0; 2];
    }

    pub fn numerator(&self) -> &[f64; 3] {
        &self.b
    }

    pub fn denominator(&self) -> &[f64; 2] {
        &self.a
    }

    /// Poles strictly inside the unit circle
    pub fn is_stable(&self) -> bool {
        self.a[1].abs() < 1.0 && self.a[0].abs() < 1.0 + self.a[1]
    }

    /// Complex response at `frequency_hz`
    fn response(&self, frequency_hz: f64, sample_rate: f64) -> Complex64 {
        let w = 2.0 * PI * frequency_hz / sample_rate;
        let z1 = Complex64::from_polar(1.0, -w);
        let z2 = z1 * z1;
        let num = Complex64::new(self.b[0], 0.0) + z1 * self.b[1] + z2 * self.b[2];
        let den = Complex64::new(1.0, 0.0) + z1 * self.a[0] + z2 * self.a[1];
        num / den
    }
}

/// A designed band-pass cascade
#[derive(Debug, Clone)]
pub struct BandpassDesign {
    pub lowcut_hz: f64,
    pub highcut_hz: f64,
    pub sample_rate_hz: f64,
    pub order: usize,
    sections: Vec<Biquad>,
}

impl BandpassDesign {
    /// Butterworth band-pass of prototype order `order` (2 * order poles)
    pub fn butterworth(
        order: usize,
        lowcut_hz: f64,
        highcut_hz: f64,
        sample_rate_hz: f64,
    ) -> Self {
        let fs2 = 2.0 * sample_rate_hz;
        let w1 = prewarp(lowcut_hz, sample_rate_hz);
        let w2 = prewarp(highcut_hz, sample_rate_hz);
        let w0_sq = w1 * w2;
        let bw = w2 - w1;

        let to_z = |s: Complex64| (Complex64::new(fs2, 0.0) + s) / (Complex64::new(fs2, 0.0) - s);
        let split = |p: Complex64| {
            let a = p * (bw / 2.0);
            let d = (a * a - w0_sq).sqrt();
            (a + d, a - d)
        };

        // Gain: bw^N * (2fs)^N / prod(2fs - p) over every analog band-pass pole
        let mut pole_product = Complex64::new(1.0, 0.0);
        let mut sections = Vec::with_capacity(order);

        for p in butterworth_poles(order) {
            if p.im < -1e-12 {
                // Covered by its conjugate
                continue;
            }
            let (q1, q2) = split(p);
            if p.im > 1e-12 {
                for q in [q1, q2] {
                    let z = to_z(q);
                    sections.push(Biquad::new([1.0, 0.0, -1.0], [-2.0 * z.re, z.norm_sqr()]));
                    let edge = Complex64::new(fs2, 0.0) - q;
                    pole_product *= edge * edge.conj();
                }
            } else {
                let (z1, z2) = (to_z(q1), to_z(q2));
                sections.push(Biquad::new(
                    [1.0, 0.0, -1.0],
                    [-(z1 + z2).re, (z1 * z2).re],
                ));
                pole_product *= (Complex64::new(fs2, 0.0) - q1) * (Complex64::new(fs2, 0.0) - q2);
            }
        }

        let gain = (bw * fs2).powi(order as i32) / pole_product.re;
        if let Some(first) = sections.first_mut() {
            for coefficient in first.b.iter_mut() {
                *coefficient *= gain;
            }
        }

        Self {
            lowcut_hz,
            highcut_hz,
            sample_rate_hz,
            order,
            sections,
        }
    }

    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    pub fn is_stable(&self) -> bool {
        self.sections.iter().all(Biquad::is_stable)
    }

    /// Magnitude response at `frequency_hz`
    pub fn magnitude_at(&self, frequency_hz: f64) -> f64 {
        self.sections
            .iter()
            .map(|s| s.response(frequency_hz, self.sample_rate_hz))
            .fold(Complex64::new(1.0, 0.0), |acc, h| acc * h)
            .norm()
    }

    /// Causal filtering of `values` from a zero initial state
    pub fn filter(&self, values: &[f64]) -> Vec<f64> {
        let mut sections = self.sections.clone();
        sections.iter_mut().for_each(Biquad::reset);
        values
            .iter()
            .map(|&x| sections.iter_mut().fold(x, |acc, s| s.process(acc)))
            .collect()
    }
}

/// Analog frequency for `frequency_hz` after bilinear prewarping
fn prewarp(frequency_hz: f64, sample_rate: f64) -> f64 {
    2.0 * sample_rate * (PI * frequency_hz / sample_rate).tan()
}

/// Left-half-plane Butterworth prototype poles
fn butterworth_poles(order: usize) -> Vec<Complex64> {
    (0..order)
        .map(|k| {
            let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
            Complex64::new(theta.cos(), theta.sin())
        })
        .collect()
}

/// Result of one filtering pass
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub series: Series,
    pub lowcut_hz: f64,
    pub highcut_hz: f64,
}

/// Cutoff pair derived from a dominant frequency
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cutoffs {
    pub lowcut_hz: f64,
    pub highcut_hz: f64,
}

/// Band-pass whose edges track the dominant period of each input
#[derive(Debug, Clone)]
pub struct AdaptiveBandpassFilter {
    lowcut_factor: f64,
    highcut_factor: f64,
    order: usize,
}

impl AdaptiveBandpassFilter {
    pub fn new(config: &ProcessingConfig) -> Self {
        let order = config.filter_order.clamp(1, MAX_FILTER_ORDER);
        if order != config.filter_order {
            tracing::warn!(
                "[Bandpass] Filter order {} out of range, using {}",
                config.filter_order,
                order
            );
        }
        Self {
            lowcut_factor: config.lowcut_factor,
            highcut_factor: config.highcut_factor,
            order,
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Edges for `dominant`, validated against its Nyquist frequency
    pub fn cutoffs(
        &self,
        dominant: &DominantFrequency,
        stage: &str,
    ) -> Result<Cutoffs, ProcessingError> {
        let nyquist = dominant.sample_rate_hz / 2.0;
        let lowcut = (self.lowcut_factor / dominant.period_secs).max(f64::MIN_POSITIVE);
        let highcut = self.highcut_factor / dominant.period_secs;

        if !lowcut.is_finite() || !highcut.is_finite() || highcut >= nyquist || lowcut >= highcut
        {
            return Err(ProcessingError::InvalidCutoff {
                stage: stage.to_string(),
                lowcut_hz: lowcut,
                highcut_hz: highcut,
                nyquist_hz: nyquist,
            });
        }

        Ok(Cutoffs {
            lowcut_hz: lowcut,
            highcut_hz: highcut,
        })
    }

    pub fn design(
        &self,
        dominant: &DominantFrequency,
        stage: &str,
    ) -> Result<BandpassDesign, ProcessingError> {
        let cutoffs = self.cutoffs(dominant, stage)?;
        let design = BandpassDesign::butterworth(
            self.order,
            cutoffs.lowcut_hz,
            cutoffs.highcut_hz,
            dominant.sample_rate_hz,
        );
        tracing::debug!(
            "[Bandpass] {}: order {} band {:.4}-{:.4} Hz at fs={:.3} Hz",
            stage,
            self.order,
            cutoffs.lowcut_hz,
            cutoffs.highcut_hz,
            dominant.sample_rate_hz
        );
        Ok(design)
    }

    /// Filter `series` with edges derived from `dominant`; timestamps are kept
    pub fn apply(
        &self,
        series: &Series,
        dominant: &DominantFrequency,
        stage: &str,
    ) -> Result<FilterOutcome, ProcessingError> {
        let design = self.design(dominant, stage)?;
        let filtered = design.filter(&series.values());
        Ok(FilterOutcome {
            series: series.with_values(filtered),
            lowcut_hz: design.lowcut_hz,
            highcut_hz: design.highcut_hz,
        })
    }
}
