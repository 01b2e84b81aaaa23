//! Timestamped samples and the ordered series built from them.
//!
//! A `Series` is the unit handed between pipeline stages: acceleration as
//! captured, then velocity and displacement derived from it. Construction
//! checks that timestamps strictly increase, so every stage downstream can
//! rely on positive time steps.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ProcessingError;

/// One reading: seconds since session start and the (baseline-centred) value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Write one `timestamp,value` row
pub(crate) fn write_row<W: Write>(writer: &mut W, sample: &Sample) -> std::io::Result<()> {
    writeln!(writer, "{},{}", sample.timestamp, sample.value)
}

/// Ordered samples with strictly increasing timestamps
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    samples: Vec<Sample>,
}

impl Series {
    /// Build a series, rejecting non-finite or non-increasing timestamps
    pub fn new(samples: Vec<Sample>) -> Result<Self, ProcessingError> {
        for (index, sample) in samples.iter().enumerate() {
            let advances = index == 0 || sample.timestamp > samples[index - 1].timestamp;
            if !sample.timestamp.is_finite() || !advances {
                return Err(ProcessingError::NonMonotonicTimestamps {
                    index,
                    timestamp: sample.timestamp,
                });
            }
        }
        Ok(Self { samples })
    }

    /// Build from parallel timestamp/value slices (zipped to the shorter one)
    pub fn from_parts(timestamps: &[f64], values: &[f64]) -> Result<Self, ProcessingError> {
        Self::new(
            timestamps
                .iter()
                .zip(values)
                .map(|(&t, &v)| Sample::new(t, v))
                .collect(),
        )
    }

    /// Same timestamps, new values. Callers guarantee equal length.
    pub(crate) fn with_values(&self, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.samples.len());
        Self {
            samples: self
                .samples
                .iter()
                .zip(values)
                .map(|(s, v)| Sample::new(s.timestamp, v))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn timestamps(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.timestamp).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Time between first and last sample (0 for fewer than two samples)
    pub fn duration(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0.0,
        }
    }

    /// Mean sampling rate, `(L - 1) / (t_last - t_first)`
    pub fn sample_rate(&self) -> Option<f64> {
        if self.samples.len() < 2 {
            return None;
        }
        let span = self.duration();
        if span <= 0.0 {
            return None;
        }
        Some((self.samples.len() - 1) as f64 / span)
    }

    /// Largest absolute value in the series
    pub fn peak_abs(&self) -> f64 {
        self.samples
            .iter()
            .fold(0.0_f64, |acc, s| acc.max(s.value.abs()))
    }

    /// Parse `timestamp,value` rows; blank lines are skipped
    pub fn parse_csv<R: BufRead>(reader: R) -> Result<Self, ProcessingError> {
        let mut samples = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.map_err(|err| ProcessingError::Parse {
                line: line_no,
                details: err.to_string(),
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let mut fields = trimmed.split(',').map(str::trim);
            let (Some(ts), Some(value), None) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(ProcessingError::Parse {
                    line: line_no,
                    details: format!("expected `timestamp,value`, got `{}`", trimmed),
                });
            };
            let parse = |field: &str, name: &str| {
                field.parse::<f64>().map_err(|err| ProcessingError::Parse {
                    line: line_no,
                    details: format!("bad {} `{}`: {}", name, field, err),
                })
            };
            samples.push(Sample::new(parse(ts, "timestamp")?, parse(value, "value")?));
        }
        Self::new(samples)
    }

    /// Read a series from a CSV file
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self, ProcessingError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| ProcessingError::Io {
            path: path.display().to_string(),
            details: err.to_string(),
        })?;
        Self::parse_csv(BufReader::new(file))
    }

    /// Write the series as CSV, replacing any existing file
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), ProcessingError> {
        let path = path.as_ref();
        let io_err = |err: std::io::Error| ProcessingError::Io {
            path: path.display().to_string(),
            details: err.to_string(),
        };
        let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
        for sample in &self.samples {
            write_row(&mut writer, sample).map_err(io_err)?;
        }
        writer.flush().map_err(io_err)
    }
}
