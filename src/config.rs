//! Configuration management for capture and processing parameters
//!
//! This module provides runtime configuration loading from JSON files so a
//! deployed recorder can be retuned (trigger tolerance, window sizes, filter
//! factors) without recompilation. CLI flags override whatever the file sets.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CaptureError;

/// Highest channel index on the 8-channel ADC the recorder targets
pub const MAX_CHANNEL: u8 = 7;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub capture: CaptureConfig,
    pub processing: ProcessingConfig,
}

/// Live capture parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Samples kept from just before the trigger (ring buffer capacity)
    pub pre_trigger_samples: usize,
    /// Quiescent samples averaged into the baseline
    pub baseline_samples: usize,
    /// Deviation from baseline above which a disturbance starts
    pub trigger_tolerance: f64,
    /// Sample-to-sample change below which a reading counts as "no change"
    pub end_tolerance: f64,
    /// Recording stops once more than this many consecutive readings show no change
    pub end_tolerance_count: u32,
    /// Sleep between reads, in seconds
    pub sleep_secs: f64,
    /// Upper bound on post-trigger samples (unbounded when absent)
    pub max_samples: Option<u64>,
    /// Upper bound on post-trigger recording time in seconds (unbounded when absent)
    pub max_duration_secs: Option<f64>,
    /// ADC channel to sample
    pub channel: u8,
    /// CSV file receiving the captured rows
    pub output_path: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            pre_trigger_samples: 20,
            baseline_samples: 100,
            trigger_tolerance: 5.0,
            end_tolerance: 5.0,
            end_tolerance_count: 100,
            sleep_secs: 0.001,
            max_samples: None,
            max_duration_secs: None,
            channel: 0,
            output_path: PathBuf::from("saved_CSVs/our_data.csv"),
        }
    }
}

impl CaptureConfig {
    /// Check ranges before a session is started
    pub fn validate(&self) -> Result<(), CaptureError> {
        let invalid = |reason: String| Err(CaptureError::InvalidConfig { reason });

        if self.baseline_samples == 0 {
            return Err(CaptureError::InsufficientSamples {
                required: 0,
                collected: 0,
            });
        }
        if !self.trigger_tolerance.is_finite() || self.trigger_tolerance < 0.0 {
            return invalid(format!(
                "trigger tolerance must be a non-negative number (got {})",
                self.trigger_tolerance
            ));
        }
        if !self.end_tolerance.is_finite() || self.end_tolerance < 0.0 {
            return invalid(format!(
                "end tolerance must be a non-negative number (got {})",
                self.end_tolerance
            ));
        }
        if Duration::try_from_secs_f64(self.sleep_secs).is_err() {
            return invalid(format!(
                "sleep time must be a representable non-negative number of seconds (got {})",
                self.sleep_secs
            ));
        }
        if let Some(max_duration) = self.max_duration_secs {
            if max_duration.is_nan() || max_duration <= 0.0 {
                return invalid(format!(
                    "max duration must be positive (got {})",
                    max_duration
                ));
            }
        }
        if self.max_samples == Some(0) {
            return invalid("max samples must be at least 1".to_string());
        }
        if self.channel > MAX_CHANNEL {
            return invalid(format!(
                "channel must be 0-{} (got {})",
                MAX_CHANNEL, self.channel
            ));
        }
        Ok(())
    }

    /// Inter-sample sleep as a `Duration`, saturating for unvalidated values
    pub fn sleep_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.sleep_secs.max(0.0)).unwrap_or(Duration::MAX)
    }
}

/// Offline displacement pipeline parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Low cutoff as a multiple of the dominant frequency (0.3 / Tb)
    pub lowcut_factor: f64,
    /// High cutoff as a multiple of the dominant frequency (8 / Tb)
    pub highcut_factor: f64,
    /// Butterworth prototype order; the band-pass has twice as many poles
    pub filter_order: usize,
    /// Frequency used when a spectrum has no usable peak; fail when absent
    pub fallback_frequency_hz: Option<f64>,
    /// Peak magnitudes at or below this are treated as a flat spectrum
    pub min_peak_magnitude: f64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            lowcut_factor: 0.3,
            highcut_factor: 8.0,
            filter_order: 2,
            fallback_frequency_hz: None,
            min_peak_magnitude: 1e-9,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file is missing or
    /// the JSON is invalid (a warning is logged either way).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}
