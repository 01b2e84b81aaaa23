//! Sample sources feeding the capture loop.
//!
//! The capture session only needs "give me the next reading". Hardware ADC
//! access lives behind this trait outside the crate; what ships here are the
//! sources needed to run the recorder without hardware: a CSV replay with its
//! own cursor, a fixed scripted sequence, and a seeded synthetic shake.

use std::f64::consts::PI;
use std::path::Path;

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, ProcessingError};
use crate::series::Series;

/// Synchronous single-channel reading source
pub trait SampleSource {
    /// Produce the next raw reading or fail with `SourceUnavailable`
    fn read(&mut self) -> Result<f64, CaptureError>;

    /// Channel the source reads from
    fn channel(&self) -> u8;
}

/// Replays the value column of a recorded CSV, one row per read
///
/// The row cursor is owned by the source; two replays of the same file never
/// interfere with each other.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    values: Vec<f64>,
    cursor: usize,
    channel: u8,
}

impl ReplaySource {
    pub fn new(values: Vec<f64>, channel: u8) -> Self {
        Self {
            values,
            cursor: 0,
            channel,
        }
    }

    /// Load the value column of a `timestamp,value` file
    pub fn from_csv<P: AsRef<Path>>(path: P, channel: u8) -> Result<Self, ProcessingError> {
        let series = Series::read_csv(path)?;
        Ok(Self::new(series.values(), channel))
    }

    /// Rows consumed so far
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.values.len() - self.cursor
    }
}

impl SampleSource for ReplaySource {
    fn read(&mut self) -> Result<f64, CaptureError> {
        let value = self
            .values
            .get(self.cursor)
            .copied()
            .ok_or_else(|| CaptureError::SourceUnavailable {
                channel: self.channel,
                sample_index: self.cursor as u64,
                reason: format!("replay exhausted after {} rows", self.values.len()),
            })?;
        self.cursor += 1;
        if self.cursor % 100 == 0 {
            tracing::debug!("[ReplaySource] Now reading row {}", self.cursor);
        }
        Ok(value)
    }

    fn channel(&self) -> u8 {
        self.channel
    }
}

/// Plays back a fixed list of readings, then reports the source as unavailable
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    inner: ReplaySource,
}

impl ScriptedSource {
    pub fn new<I: IntoIterator<Item = f64>>(readings: I) -> Self {
        Self {
            inner: ReplaySource::new(readings.into_iter().collect(), 0),
        }
    }

    /// Readings handed out so far
    pub fn consumed(&self) -> usize {
        self.inner.cursor()
    }
}

impl SampleSource for ScriptedSource {
    fn read(&mut self) -> Result<f64, CaptureError> {
        self.inner.read()
    }

    fn channel(&self) -> u8 {
        self.inner.channel()
    }
}

/// Shape of the synthetic disturbance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSpec {
    /// Raw level of the quiet channel (ADC counts)
    pub resting_level: f64,
    /// Half width of the uniform noise floor
    pub noise_amplitude: f64,
    /// Reads before the burst begins
    pub quiet_reads: u64,
    /// Reads the burst lasts
    pub burst_reads: u64,
    /// Burst amplitude in ADC counts
    pub burst_amplitude: f64,
    /// Burst cycles per read
    pub cycles_per_read: f64,
    /// Total reads before the source runs dry (unbounded when absent)
    pub total_reads: Option<u64>,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            resting_level: 512.0,
            noise_amplitude: 1.0,
            quiet_reads: 400,
            burst_reads: 600,
            burst_amplitude: 120.0,
            cycles_per_read: 0.02,
            total_reads: None,
        }
    }
}

/// Seeded noise floor with one Hann-enveloped sine burst
pub struct SyntheticSource {
    spec: SyntheticSpec,
    rng: StdRng,
    reads: u64,
    channel: u8,
}

impl SyntheticSource {
    pub fn new(spec: SyntheticSpec, channel: u8) -> Self {
        Self {
            spec,
            rng: StdRng::seed_from_u64(0x5EED_5EED),
            reads: 0,
            channel,
        }
    }

    fn burst_value(&self, index: u64) -> f64 {
        let spec = &self.spec;
        if index < spec.quiet_reads || spec.burst_reads == 0 {
            return 0.0;
        }
        let offset = index - spec.quiet_reads;
        if offset >= spec.burst_reads {
            return 0.0;
        }
        let progress = offset as f64 / spec.burst_reads as f64;
        let envelope = (PI * progress).sin().powi(2);
        spec.burst_amplitude * envelope * (2.0 * PI * spec.cycles_per_read * offset as f64).sin()
    }
}

impl SampleSource for SyntheticSource {
    fn read(&mut self) -> Result<f64, CaptureError> {
        if let Some(total) = self.spec.total_reads {
            if self.reads >= total {
                return Err(CaptureError::SourceUnavailable {
                    channel: self.channel,
                    sample_index: self.reads,
                    reason: format!("synthetic source limited to {} reads", total),
                });
            }
        }

        let noise = if self.spec.noise_amplitude > 0.0 {
            self.rng
                .gen_range(-self.spec.noise_amplitude..self.spec.noise_amplitude)
        } else {
            0.0
        };
        let value = self.spec.resting_level + noise + self.burst_value(self.reads);
        self.reads += 1;
        Ok(value)
    }

    fn channel(&self) -> u8 {
        self.channel
    }
}
