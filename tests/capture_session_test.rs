use shake_capture::capture::{
    CaptureSession, CsvSampleSink, ManualClock, MemorySampleSink, ReplaySource, SampleSink,
    ScriptedSource, StopReason, TriggerState,
};
use shake_capture::config::CaptureConfig;
use shake_capture::error::CaptureError;
use shake_capture::series::{Sample, Series};

/// Four baseline zeros, one quiet armed reading, then a trigger at 10
const LEAD_IN: [f64; 6] = [0.0, 0.0, 0.0, 0.0, 0.0, 10.0];

fn config() -> CaptureConfig {
    CaptureConfig {
        pre_trigger_samples: 3,
        baseline_samples: 4,
        trigger_tolerance: 5.0,
        end_tolerance: 0.5,
        end_tolerance_count: 2,
        sleep_secs: 0.25,
        max_samples: None,
        max_duration_secs: None,
        ..CaptureConfig::default()
    }
}

/// Lead-in followed by `count` readings that never settle
fn restless(count: usize) -> Vec<f64> {
    let mut readings = LEAD_IN.to_vec();
    readings.extend((0..count).map(|i| if i % 2 == 0 { 0.0 } else { 10.0 }));
    readings
}

#[test]
fn stops_on_max_samples() {
    let mut cfg = config();
    cfg.max_samples = Some(3);
    let mut source = ScriptedSource::new(restless(20));
    let mut clock = ManualClock::new();
    let mut sink = MemorySampleSink::new();
    let mut session = CaptureSession::new(cfg).unwrap();

    let report = session.run(&mut source, &mut clock, &mut sink).unwrap();

    assert_eq!(report.stop_reason, StopReason::MaxSamples);
    assert_eq!(report.samples_recorded, 3);
    assert_eq!(report.pre_trigger_samples, 2);
    assert_eq!(sink.rows().len(), 5);
    assert_eq!(source.consumed(), LEAD_IN.len() + 3);
    assert_eq!(session.state(), TriggerState::Ended);
}

#[test]
fn stops_on_max_duration() {
    let mut cfg = config();
    cfg.max_duration_secs = Some(1.0);
    let mut source = ScriptedSource::new(restless(20));
    let mut clock = ManualClock::new();
    let mut sink = MemorySampleSink::new();
    let mut session = CaptureSession::new(cfg).unwrap();

    let report = session.run(&mut source, &mut clock, &mut sink).unwrap();

    // Trigger at 0.25s; rows at 0.5 .. 1.5, the last one past the 1s limit
    assert_eq!(report.stop_reason, StopReason::MaxDuration);
    assert_eq!(report.trigger_timestamp, 0.25);
    assert_eq!(report.samples_recorded, 5);
    let last = sink.rows().last().copied().unwrap();
    assert_eq!(last.timestamp, 1.5);
}

#[test]
fn stops_when_signal_settles() {
    let mut readings = LEAD_IN.to_vec();
    readings.extend([10.2, 10.1, 10.3, 99.0]);
    let mut source = ScriptedSource::new(readings);
    let mut clock = ManualClock::new();
    let mut sink = MemorySampleSink::new();
    let mut session = CaptureSession::new(config()).unwrap();

    let report = session.run(&mut source, &mut clock, &mut sink).unwrap();

    // Third unchanged reading exceeds the count of 2
    assert_eq!(report.stop_reason, StopReason::EndTolerance);
    assert_eq!(report.samples_recorded, 3);
    assert_eq!(source.consumed(), LEAD_IN.len() + 3);
    assert!(report.source_error.is_none());
}

#[test]
fn csv_file_holds_window_then_rows_in_time_order() {
    let path = std::env::temp_dir().join(format!(
        "shake-capture-session-{}/capture.csv",
        std::process::id()
    ));

    let mut cfg = config();
    cfg.max_samples = Some(4);
    cfg.output_path = path.clone();
    let mut source = ReplaySource::new(restless(10), 0);
    let mut clock = ManualClock::new();
    let mut sink = CsvSampleSink::new(&path);
    let mut session = CaptureSession::new(cfg).unwrap();

    let report = session.run(&mut source, &mut clock, &mut sink).unwrap();
    let stored = Series::read_csv(&path).unwrap();

    assert_eq!(
        stored.len() as u64,
        report.pre_trigger_samples as u64 + report.samples_recorded
    );
    assert_eq!(sink.rows_written(), stored.len() as u64);
    // Baseline-centred values: quiet 0, trigger 10, then the restless pattern
    assert_eq!(stored.values(), vec![0.0, 10.0, 0.0, 10.0, 0.0, 10.0]);
    assert_eq!(
        stored.timestamps(),
        vec![0.0, 0.25, 0.5, 0.75, 1.0, 1.25]
    );

    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[test]
fn rerun_overwrites_previous_capture() {
    let path = std::env::temp_dir().join(format!(
        "shake-capture-rerun-{}.csv",
        std::process::id()
    ));
    std::fs::write(&path, "0,1\n1,2\n2,3\n3,4\n4,5\n5,6\n6,7\n7,8\n").unwrap();

    let mut cfg = config();
    cfg.max_samples = Some(1);
    let mut source = ScriptedSource::new(restless(4));
    let mut clock = ManualClock::new();
    let mut sink = CsvSampleSink::new(&path);
    CaptureSession::new(cfg)
        .unwrap()
        .run(&mut source, &mut clock, &mut sink)
        .unwrap();

    let stored = Series::read_csv(&path).unwrap();
    assert_eq!(stored.len(), 3);

    let _ = std::fs::remove_file(&path);
}

/// Accepts the window and `rows_before_failure` rows, then reports a full disk
struct FailingSink {
    rows_before_failure: usize,
    rows: usize,
    window_written: bool,
}

impl SampleSink for FailingSink {
    fn write_window(&mut self, _window: &[Sample]) -> Result<(), CaptureError> {
        self.window_written = true;
        Ok(())
    }

    fn append(&mut self, _sample: &Sample) -> Result<(), CaptureError> {
        if self.rows == self.rows_before_failure {
            return Err(CaptureError::Io {
                context: "appending to capture.csv".to_string(),
                details: "disk full".to_string(),
            });
        }
        self.rows += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }
}

#[test]
fn storage_failure_aborts_and_ends_session() {
    let mut source = ScriptedSource::new(restless(20));
    let mut clock = ManualClock::new();
    let mut sink = FailingSink {
        rows_before_failure: 1,
        rows: 0,
        window_written: false,
    };
    let mut session = CaptureSession::new(config()).unwrap();

    let result = session.run(&mut source, &mut clock, &mut sink);

    assert!(matches!(result, Err(CaptureError::Io { .. })));
    assert!(sink.window_written);
    assert_eq!(sink.rows, 1);
    // Nothing is read after the failed write
    assert_eq!(source.consumed(), LEAD_IN.len() + 2);
    assert_eq!(session.state(), TriggerState::Ended);
    assert_eq!(
        session.detector().stop_reason(),
        Some(StopReason::StorageFailed)
    );
    assert_eq!(
        session.run(&mut source, &mut clock, &mut sink).unwrap_err(),
        CaptureError::SessionEnded
    );
}
