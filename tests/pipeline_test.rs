use std::f64::consts::PI;

use shake_capture::config::ProcessingConfig;
use shake_capture::error::ProcessingError;
use shake_capture::processing::{DisplacementEstimator, EndpointSink};
use shake_capture::series::Series;

const SAMPLE_RATE: f64 = 200.0;

/// Sine burst with raised-cosine ramps at both ends
fn tapered_burst(frequency: f64, amplitude: f64, seconds: f64, ramp: f64) -> Series {
    let count = (seconds * SAMPLE_RATE) as usize;
    let timestamps: Vec<f64> = (0..count).map(|i| i as f64 / SAMPLE_RATE).collect();
    let values: Vec<f64> = timestamps
        .iter()
        .map(|&t| {
            let envelope = if t < ramp {
                0.5 * (1.0 - (PI * t / ramp).cos())
            } else if t > seconds - ramp {
                0.5 * (1.0 - (PI * (seconds - t) / ramp).cos())
            } else {
                1.0
            };
            amplitude * envelope * (2.0 * PI * frequency * t).sin()
        })
        .collect();
    Series::from_parts(&timestamps, &values).unwrap()
}

#[test]
fn displacement_peak_matches_analytic_amplitude() {
    let frequency = 2.0;
    let amplitude = 3.0;
    let acceleration = tapered_burst(frequency, amplitude, 10.0, 2.0);
    let mut estimator = DisplacementEstimator::new(&ProcessingConfig::default());
    let mut sink = EndpointSink::new(None);

    let report = estimator
        .estimate_and_publish(&acceleration, &mut sink)
        .unwrap();

    let omega = 2.0 * PI * frequency;
    let expected = amplitude / (omega * omega);
    let ratio = report.peak_displacement / expected;
    assert!(
        (ratio - 1.0).abs() < 0.15,
        "peak {} vs analytic {} (ratio {:.3})",
        report.peak_displacement,
        expected,
        ratio
    );

    // Burst has died out, so the body should be back near rest
    assert!(
        report.final_displacement.abs() < 0.1 * expected,
        "final displacement {} did not settle",
        report.final_displacement
    );
    assert_eq!(sink.published(), &[report.final_displacement]);

    for stage in &report.stages {
        assert!(
            (stage.dominant.frequency_hz - frequency).abs() < 0.1,
            "{} stage locked onto {} Hz",
            stage.stage,
            stage.dominant.frequency_hz
        );
        assert!((stage.lowcut_hz - 0.3 * frequency).abs() < 0.05);
        assert!((stage.highcut_hz - 8.0 * frequency).abs() < 0.5);
    }
}

#[test]
fn displacement_scales_with_amplitude() {
    let mut estimator = DisplacementEstimator::new(&ProcessingConfig::default());
    let small = estimator
        .estimate(&tapered_burst(2.0, 1.0, 10.0, 2.0))
        .unwrap();
    let large = estimator
        .estimate(&tapered_burst(2.0, 4.0, 10.0, 2.0))
        .unwrap();

    let ratio = large.peak_displacement / small.peak_displacement;
    assert!((ratio - 4.0).abs() < 1e-6, "ratio {}", ratio);
}

#[test]
fn undersampled_burst_is_rejected() {
    // 20 Hz at 200 Hz puts the 160 Hz upper edge past Nyquist
    let acceleration = tapered_burst(20.0, 1.0, 5.0, 1.0);
    let mut estimator = DisplacementEstimator::new(&ProcessingConfig::default());

    match estimator.estimate(&acceleration) {
        Err(ProcessingError::InvalidCutoff {
            stage,
            highcut_hz,
            nyquist_hz,
            ..
        }) => {
            assert_eq!(stage, "acceleration");
            assert!(highcut_hz >= nyquist_hz);
        }
        other => panic!("Expected InvalidCutoff, got {:?}", other),
    }
}

#[test]
fn csv_round_trip_feeds_the_pipeline() {
    let path = std::env::temp_dir().join(format!("shake-pipeline-{}.csv", std::process::id()));
    let acceleration = tapered_burst(2.0, 1.0, 10.0, 2.0);
    acceleration.write_csv(&path).unwrap();

    let loaded = Series::read_csv(&path).unwrap();
    assert_eq!(loaded.len(), acceleration.len());

    let mut estimator = DisplacementEstimator::new(&ProcessingConfig::default());
    let from_file = estimator.estimate(&loaded).unwrap();
    let direct = estimator.estimate(&acceleration).unwrap();
    assert!((from_file.final_displacement - direct.final_displacement).abs() < 1e-9);

    let _ = std::fs::remove_file(&path);
}
