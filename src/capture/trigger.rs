// TriggerDetector - disturbance start/end state machine
//
// States:
//   Idle      -> no baseline yet
//   Armed     -> baseline known, readings fill the pre-trigger ring buffer
//   Triggered -> disturbance detected, every reading is recorded
//   Ended     -> terminal, readings are ignored
//
// Start: |reading - baseline| > tolerance. The reading that fires the trigger
// is pushed into the ring before it is frozen, so it closes the pre-trigger
// window.
//
// End (checked after each recorded reading, first match wins):
//   1. more than `end_tolerance_count` consecutive readings changed by less
//      than `end_tolerance` from their predecessor
//   2. recorded count reached `max_samples`
//   3. time since the trigger exceeds `max_duration_secs`
//
// Transitions depend only on (timestamp, reading) pairs fed in by the caller,
// so the machine is exercised in tests without any clock or hardware.

use serde::{Deserialize, Serialize};

use crate::capture::ring_buffer::RingBuffer;
use crate::config::CaptureConfig;
use crate::series::Sample;

/// Detector lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerState {
    Idle,
    Armed,
    Triggered,
    Ended,
}

/// Why recording stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Signal settled: too many consecutive readings without change
    EndTolerance,
    /// Recorded count hit the configured maximum
    MaxSamples,
    /// Recording time exceeded the configured maximum
    MaxDuration,
    /// Sample source failed after the trigger; rows so far are kept
    SourceLost,
    /// Writing a row failed; the session aborted with an error
    StorageFailed,
}

impl StopReason {
    pub fn display_name(&self) -> &'static str {
        match self {
            StopReason::EndTolerance => "end tolerance",
            StopReason::MaxSamples => "max samples",
            StopReason::MaxDuration => "max duration",
            StopReason::SourceLost => "source lost",
            StopReason::StorageFailed => "storage failed",
        }
    }
}

/// Outcome of feeding one reading to the detector
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Detector is Idle or Ended; the reading changed nothing
    Ignored,
    /// Still armed; the centred reading went into the ring buffer
    Buffered(Sample),
    /// Trigger fired; `window` is the frozen ring, oldest first, ending with the trigger reading
    Triggered { window: Vec<Sample>, deviation: f64 },
    /// Reading recorded while triggered
    Recorded(Sample),
    /// Reading recorded, then the session ended
    Ended { last: Sample, reason: StopReason },
}

/// Trigger and stop thresholds, taken from [`CaptureConfig`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerSettings {
    pub tolerance: f64,
    pub end_tolerance: f64,
    pub end_tolerance_count: u32,
    pub max_samples: Option<u64>,
    pub max_duration_secs: Option<f64>,
    pub pre_trigger_samples: usize,
}

impl From<&CaptureConfig> for TriggerSettings {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            tolerance: config.trigger_tolerance,
            end_tolerance: config.end_tolerance,
            end_tolerance_count: config.end_tolerance_count,
            max_samples: config.max_samples,
            max_duration_secs: config.max_duration_secs,
            pre_trigger_samples: config.pre_trigger_samples,
        }
    }
}

/// Baseline-relative trigger with consecutive-no-change end detection
#[derive(Debug, Clone)]
pub struct TriggerDetector {
    settings: TriggerSettings,
    state: TriggerState,
    baseline: f64,
    window: RingBuffer<Sample>,
    previous_reading: f64,
    consecutive_no_change: u32,
    samples_recorded: u64,
    trigger_timestamp: Option<f64>,
    elapsed_since_trigger: f64,
    readings_while_armed: u64,
    stop_reason: Option<StopReason>,
}

impl TriggerDetector {
    pub fn new(settings: TriggerSettings) -> Self {
        Self {
            window: RingBuffer::new(settings.pre_trigger_samples),
            settings,
            state: TriggerState::Idle,
            baseline: 0.0,
            previous_reading: 0.0,
            consecutive_no_change: 0,
            samples_recorded: 0,
            trigger_timestamp: None,
            elapsed_since_trigger: 0.0,
            readings_while_armed: 0,
            stop_reason: None,
        }
    }

    /// Idle -> Armed. Returns false (and changes nothing) from any other state.
    pub fn arm(&mut self, baseline: f64) -> bool {
        if self.state != TriggerState::Idle {
            return false;
        }
        self.baseline = baseline;
        self.state = TriggerState::Armed;
        true
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn samples_recorded(&self) -> u64 {
        self.samples_recorded
    }

    pub fn consecutive_no_change(&self) -> u32 {
        self.consecutive_no_change
    }

    pub fn trigger_timestamp(&self) -> Option<f64> {
        self.trigger_timestamp
    }

    pub fn elapsed_since_trigger(&self) -> f64 {
        self.elapsed_since_trigger
    }

    /// Readings seen while armed, including the one that fired the trigger
    pub fn readings_while_armed(&self) -> u64 {
        self.readings_while_armed
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// Pre-trigger window as it stands (oldest first); empty once frozen
    pub fn pending_window(&self) -> Vec<Sample> {
        self.window.read_ordered()
    }

    /// Force the terminal state, e.g. when the source disappears
    pub fn end(&mut self, reason: StopReason) {
        if self.state != TriggerState::Ended {
            self.state = TriggerState::Ended;
            self.stop_reason = Some(reason);
        }
    }

    /// Feed one raw reading taken at `timestamp`
    pub fn observe(&mut self, timestamp: f64, reading: f64) -> Transition {
        match self.state {
            TriggerState::Idle | TriggerState::Ended => Transition::Ignored,
            TriggerState::Armed => self.observe_armed(timestamp, reading),
            TriggerState::Triggered => self.observe_triggered(timestamp, reading),
        }
    }

    fn observe_armed(&mut self, timestamp: f64, reading: f64) -> Transition {
        let centred = Sample::new(timestamp, reading - self.baseline);
        let deviation = centred.value.abs();
        self.readings_while_armed += 1;
        self.window.push(centred);

        if deviation > self.settings.tolerance {
            self.state = TriggerState::Triggered;
            self.trigger_timestamp = Some(timestamp);
            self.previous_reading = reading;
            tracing::info!(
                "[TriggerDetector] Change threshold met at t={:.4}s: deviation {:.3} > {:.3}",
                timestamp,
                deviation,
                self.settings.tolerance
            );
            return Transition::Triggered {
                window: self.window.take_ordered(),
                deviation,
            };
        }

        Transition::Buffered(centred)
    }

    fn observe_triggered(&mut self, timestamp: f64, reading: f64) -> Transition {
        let sample = Sample::new(timestamp, reading - self.baseline);
        self.samples_recorded += 1;

        if (reading - self.previous_reading).abs() < self.settings.end_tolerance {
            self.consecutive_no_change = self.consecutive_no_change.saturating_add(1);
        } else {
            self.consecutive_no_change = 0;
        }
        self.previous_reading = reading;
        self.elapsed_since_trigger = timestamp - self.trigger_timestamp.unwrap_or(timestamp);

        match self.check_stop() {
            Some(reason) => {
                self.end(reason);
                tracing::info!(
                    "[TriggerDetector] Recording ended ({}) after {} samples",
                    reason.display_name(),
                    self.samples_recorded
                );
                Transition::Ended {
                    last: sample,
                    reason,
                }
            }
            None => Transition::Recorded(sample),
        }
    }

    fn check_stop(&self) -> Option<StopReason> {
        if self.consecutive_no_change > self.settings.end_tolerance_count {
            return Some(StopReason::EndTolerance);
        }
        if let Some(max_samples) = self.settings.max_samples {
            if self.samples_recorded >= max_samples {
                return Some(StopReason::MaxSamples);
            }
        }
        if let Some(max_duration) = self.settings.max_duration_secs {
            if self.elapsed_since_trigger > max_duration {
                return Some(StopReason::MaxDuration);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(tolerance: f64) -> TriggerSettings {
        TriggerSettings {
            tolerance,
            end_tolerance: 0.5,
            end_tolerance_count: 3,
            max_samples: None,
            max_duration_secs: None,
            pre_trigger_samples: 3,
        }
    }

    fn armed(settings: TriggerSettings, baseline: f64) -> TriggerDetector {
        let mut detector = TriggerDetector::new(settings);
        assert!(detector.arm(baseline));
        detector
    }

    #[test]
    fn test_idle_detector_ignores_readings() {
        let mut detector = TriggerDetector::new(settings(2.0));
        assert_eq!(detector.state(), TriggerState::Idle);
        assert_eq!(detector.observe(0.0, 100.0), Transition::Ignored);
        assert_eq!(detector.state(), TriggerState::Idle);
    }

    #[test]
    fn test_trigger_fires_on_first_exceeding_sample() {
        let mut detector = armed(settings(2.0), 0.0);
        let readings = [0.0, 1.0, 1.0, 5.0];

        let mut fired_at = None;
        for (index, &reading) in readings.iter().enumerate() {
            if let Transition::Triggered { .. } = detector.observe(index as f64, reading) {
                fired_at = Some(index);
                break;
            }
        }

        assert_eq!(fired_at, Some(3));
        assert_eq!(detector.state(), TriggerState::Triggered);
        assert_eq!(detector.trigger_timestamp(), Some(3.0));
    }

    #[test]
    fn test_bounded_deviation_never_triggers() {
        let mut detector = armed(settings(2.0), 10.0);
        // Deviation exactly at tolerance stays armed
        for (index, reading) in [8.0, 12.0, 11.5, 9.0, 10.0, 12.0, 8.0].iter().enumerate() {
            let transition = detector.observe(index as f64, *reading);
            assert!(
                matches!(transition, Transition::Buffered(_)),
                "reading {} must not trigger",
                reading
            );
        }
        assert_eq!(detector.state(), TriggerState::Armed);
        assert_eq!(detector.readings_while_armed(), 7);
    }

    #[test]
    fn test_window_is_centred_ordered_and_ends_with_trigger() {
        let mut detector = armed(settings(2.0), 100.0);
        for (index, reading) in [100.0, 101.0, 99.0, 100.5].iter().enumerate() {
            detector.observe(index as f64, *reading);
        }

        match detector.observe(4.0, 110.0) {
            Transition::Triggered { window, deviation } => {
                assert_eq!(deviation, 10.0);
                assert_eq!(
                    window,
                    vec![
                        Sample::new(2.0, -1.0),
                        Sample::new(3.0, 0.5),
                        Sample::new(4.0, 10.0),
                    ]
                );
            }
            other => panic!("Expected trigger, got {:?}", other),
        }
        assert!(detector.pending_window().is_empty());
    }

    #[test]
    fn test_end_tolerance_counts_consecutive_quiet_readings() {
        let mut detector = armed(settings(2.0), 0.0);
        detector.observe(0.0, 5.0);

        // Big change resets, then four quiet readings exceed the count of 3
        assert!(matches!(detector.observe(1.0, 9.0), Transition::Recorded(_)));
        assert_eq!(detector.consecutive_no_change(), 0);
        assert!(matches!(detector.observe(2.0, 9.1), Transition::Recorded(_)));
        assert!(matches!(detector.observe(3.0, 9.2), Transition::Recorded(_)));
        assert!(matches!(detector.observe(4.0, 9.3), Transition::Recorded(_)));
        assert_eq!(detector.consecutive_no_change(), 3);

        match detector.observe(5.0, 9.4) {
            Transition::Ended { last, reason } => {
                assert_eq!(reason, StopReason::EndTolerance);
                assert!((last.value - 9.4).abs() < 1e-12);
            }
            other => panic!("Expected end, got {:?}", other),
        }
        assert_eq!(detector.samples_recorded(), 5);
        assert_eq!(detector.observe(6.0, 50.0), Transition::Ignored);
    }

    #[test]
    fn test_max_samples_stops_recording() {
        let mut config = settings(1.0);
        config.max_samples = Some(2);
        config.end_tolerance = 0.0;
        let mut detector = armed(config, 0.0);
        detector.observe(0.0, 3.0);

        assert!(matches!(detector.observe(1.0, 1.0), Transition::Recorded(_)));
        assert!(matches!(
            detector.observe(2.0, 2.0),
            Transition::Ended {
                reason: StopReason::MaxSamples,
                ..
            }
        ));
        assert_eq!(detector.stop_reason(), Some(StopReason::MaxSamples));
    }

    #[test]
    fn test_max_duration_stops_recording() {
        let mut config = settings(1.0);
        config.max_duration_secs = Some(1.0);
        config.end_tolerance = 0.0;
        let mut detector = armed(config, 0.0);
        detector.observe(10.0, 3.0);

        assert!(matches!(detector.observe(10.5, 1.0), Transition::Recorded(_)));
        // Exactly at the limit is not "exceeds"
        assert!(matches!(detector.observe(11.0, 2.0), Transition::Recorded(_)));
        assert!(matches!(
            detector.observe(11.25, 3.0),
            Transition::Ended {
                reason: StopReason::MaxDuration,
                ..
            }
        ));
        assert_eq!(detector.elapsed_since_trigger(), 1.25);
    }

    #[test]
    fn test_zero_variance_input_does_not_panic() {
        let mut detector = armed(settings(0.0), 0.0);
        for index in 0..10 {
            assert!(matches!(
                detector.observe(index as f64, 0.0),
                Transition::Buffered(_)
            ));
        }
        // NaN readings never compare greater than the tolerance
        assert!(matches!(
            detector.observe(10.0, f64::NAN),
            Transition::Buffered(_)
        ));
    }

    #[test]
    fn test_arm_only_from_idle() {
        let mut detector = armed(settings(2.0), 1.0);
        assert!(!detector.arm(5.0));
        assert_eq!(detector.baseline(), 1.0);

        detector.end(StopReason::SourceLost);
        assert_eq!(detector.state(), TriggerState::Ended);
        assert_eq!(detector.stop_reason(), Some(StopReason::SourceLost));
    }

    #[test]
    fn test_no_change_counter_saturates() {
        let mut detector = armed(
            TriggerSettings {
                end_tolerance_count: u32::MAX,
                ..settings(2.0)
            },
            0.0,
        );
        assert!(matches!(
            detector.observe(0.0, 5.0),
            Transition::Triggered { .. }
        ));
        detector.consecutive_no_change = u32::MAX - 1;

        for index in 1..4 {
            assert!(matches!(
                detector.observe(index as f64, 5.0),
                Transition::Recorded(_)
            ));
        }
        assert_eq!(detector.consecutive_no_change(), u32::MAX);
        assert_eq!(detector.state(), TriggerState::Triggered);
    }
}
