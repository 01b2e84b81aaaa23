// CaptureSession - one baseline -> trigger -> record run
//
// Single-threaded loop: read, timestamp, feed the detector, persist, sleep.
// The frozen pre-trigger window is written (overwrite mode) before the first
// post-trigger row is appended, so the stored file is in causal order.
// Cancellation only happens between iterations, through the detector's
// max-count and max-time limits.

use serde::Serialize;

use crate::capture::baseline::BaselineEstimator;
use crate::capture::clock::Clock;
use crate::capture::source::SampleSource;
use crate::capture::storage::SampleSink;
use crate::capture::trigger::{
    StopReason, Transition, TriggerDetector, TriggerSettings, TriggerState,
};
use crate::config::CaptureConfig;
use crate::error::{log_capture_error, CaptureError, ErrorCode};

/// Smallest step used to keep stored timestamps strictly increasing
const MIN_TIMESTAMP_STEP: f64 = 1e-9;

/// Summary of a finished capture
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureReport {
    pub channel: u8,
    pub baseline: f64,
    pub trigger_timestamp: f64,
    pub pre_trigger_samples: usize,
    pub samples_recorded: u64,
    pub elapsed_seconds: f64,
    pub stop_reason: StopReason,
    /// Source failure that ended the recording, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_error: Option<String>,
}

impl CaptureReport {
    /// Achieved post-trigger sampling rate
    pub fn samples_per_second(&self) -> f64 {
        if self.elapsed_seconds > 0.0 {
            self.samples_recorded as f64 / self.elapsed_seconds
        } else {
            0.0
        }
    }
}

/// Owns the detector, its ring buffer and counters for exactly one run
pub struct CaptureSession {
    config: CaptureConfig,
    detector: TriggerDetector,
    last_timestamp: Option<f64>,
}

impl CaptureSession {
    pub fn new(config: CaptureConfig) -> Result<Self, CaptureError> {
        config.validate()?;
        Ok(Self {
            detector: TriggerDetector::new(TriggerSettings::from(&config)),
            config,
            last_timestamp: None,
        })
    }

    pub fn state(&self) -> TriggerState {
        self.detector.state()
    }

    pub fn detector(&self) -> &TriggerDetector {
        &self.detector
    }

    /// Run the session to completion
    ///
    /// Source failures before the trigger are returned as errors. After the
    /// trigger they end the session with [`StopReason::SourceLost`]; the rows
    /// already written stay valid. Storage failures always abort.
    pub fn run<S, C, K>(
        &mut self,
        source: &mut S,
        clock: &mut C,
        sink: &mut K,
    ) -> Result<CaptureReport, CaptureError>
    where
        S: SampleSource + ?Sized,
        C: Clock + ?Sized,
        K: SampleSink + ?Sized,
    {
        if self.detector.state() != TriggerState::Idle {
            return Err(CaptureError::SessionEnded);
        }

        let baseline = BaselineEstimator::new(self.config.baseline_samples)
            .establish(|| source.read())
            .inspect_err(|err| log_capture_error(err, "baseline"))?;
        self.detector.arm(baseline);

        let pre_trigger_samples = match self.wait_for_trigger(source, clock, sink) {
            Ok(count) => count,
            Err(err) => return Err(self.abort(err, "armed")),
        };
        let trigger_timestamp = self.detector.trigger_timestamp().unwrap_or_default();

        let source_error = match self.record(source, clock, sink) {
            Ok(source_error) => source_error,
            Err(err) => return Err(self.abort(err, "recording")),
        };
        if let Err(err) = sink.finish() {
            return Err(self.abort(err, "finishing"));
        }

        let report = CaptureReport {
            channel: source.channel(),
            baseline,
            trigger_timestamp,
            pre_trigger_samples,
            samples_recorded: self.detector.samples_recorded(),
            elapsed_seconds: (clock.now() - trigger_timestamp).max(0.0),
            stop_reason: self
                .detector
                .stop_reason()
                .unwrap_or(StopReason::SourceLost),
            source_error,
        };

        tracing::info!(
            "[CaptureSession] Recording complete: {} samples in {:.3}s ({:.1}/s), stop reason: {}",
            report.samples_recorded,
            report.elapsed_seconds,
            report.samples_per_second(),
            report.stop_reason.display_name()
        );
        Ok(report)
    }

    /// Armed phase. Returns the number of pre-trigger rows written.
    fn wait_for_trigger<S, C, K>(
        &mut self,
        source: &mut S,
        clock: &mut C,
        sink: &mut K,
    ) -> Result<usize, CaptureError>
    where
        S: SampleSource + ?Sized,
        C: Clock + ?Sized,
        K: SampleSink + ?Sized,
    {
        let interval = self.config.sleep_interval();
        loop {
            let reading = source.read()?;
            let timestamp = self.next_timestamp(clock);

            let transition = self.detector.observe(timestamp, reading);
            clock.sleep(interval);

            if let Transition::Triggered { window, .. } = transition {
                sink.write_window(&window)?;
                tracing::debug!(
                    "[CaptureSession] Flushed {} pre-trigger samples",
                    window.len()
                );
                return Ok(window.len());
            }
        }
    }

    /// Triggered phase. Returns the source error message if the source died.
    fn record<S, C, K>(
        &mut self,
        source: &mut S,
        clock: &mut C,
        sink: &mut K,
    ) -> Result<Option<String>, CaptureError>
    where
        S: SampleSource + ?Sized,
        C: Clock + ?Sized,
        K: SampleSink + ?Sized,
    {
        let interval = self.config.sleep_interval();
        loop {
            let reading = match source.read() {
                Ok(reading) => reading,
                Err(err) => {
                    tracing::warn!(
                        "[CaptureSession] Source lost after {} samples (code {}): {}",
                        self.detector.samples_recorded(),
                        err.code(),
                        err.message()
                    );
                    self.detector.end(StopReason::SourceLost);
                    return Ok(Some(err.message()));
                }
            };
            let timestamp = self.next_timestamp(clock);

            match self.detector.observe(timestamp, reading) {
                Transition::Recorded(sample) => sink.append(&sample)?,
                Transition::Ended { last, .. } => {
                    sink.append(&last)?;
                    return Ok(None);
                }
                // Only reachable if the detector was ended externally
                _ => return Ok(None),
            }
            clock.sleep(interval);
        }
    }

    /// Put the detector in its terminal state and hand back the fatal error
    fn abort(&mut self, err: CaptureError, context: &str) -> CaptureError {
        log_capture_error(&err, context);
        let reason = match err {
            CaptureError::Io { .. } => StopReason::StorageFailed,
            _ => StopReason::SourceLost,
        };
        self.detector.end(reason);
        err
    }

    fn next_timestamp<C: Clock + ?Sized>(&mut self, clock: &C) -> f64 {
        let now = clock.now();
        let timestamp = match self.last_timestamp {
            Some(last) if now <= last => last + MIN_TIMESTAMP_STEP,
            _ => now,
        };
        self.last_timestamp = Some(timestamp);
        timestamp
    }
}
