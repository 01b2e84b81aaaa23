use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use shake_capture::capture::{
    CaptureSession, CsvSampleSink, ReplaySource, SampleSource, SyntheticSource, SyntheticSpec,
    SystemClock,
};
use shake_capture::config::AppConfig;
use shake_capture::error::ErrorCode;
use shake_capture::processing::{DisplacementEstimator, EndpointSink, StageSummary};
use shake_capture::series::Series;

#[derive(Parser, Debug)]
#[command(
    name = "shake_cli",
    about = "Triggered vibration capture and displacement estimation"
)]
struct Cli {
    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Wait for a disturbance, then record it to CSV
    Record(RecordArgs),
    /// Estimate displacement from a recorded acceleration CSV
    Process(ProcessArgs),
}

#[derive(Args, Debug)]
struct RecordArgs {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Readings kept from before the trigger [default: 20]
    #[arg(long, short = 'b')]
    before: Option<usize>,
    /// Maximum post-trigger readings [default: unbounded]
    #[arg(long, short = 'n')]
    num: Option<u64>,
    /// Deviation from baseline that starts recording [default: 5]
    #[arg(long, short = 't')]
    tolerance: Option<f64>,
    /// Change between readings treated as "no change" [default: 5]
    #[arg(long)]
    end_tolerance: Option<f64>,
    /// Consecutive unchanged readings that end recording [default: 100]
    #[arg(long, short = 'e', alias = "endtolerance")]
    end_count: Option<u32>,
    /// Pause between reads in seconds [default: 0.001]
    #[arg(long, short = 's', alias = "sleeptime")]
    sleep_time: Option<f64>,
    /// Output CSV [default: saved_CSVs/our_data.csv]
    #[arg(long, short = 'f')]
    filename: Option<PathBuf>,
    /// Maximum recording time in seconds [default: unbounded]
    #[arg(long, short = 'm', alias = "maxtime")]
    max_time: Option<f64>,
    /// Readings averaged for the baseline [default: 100]
    #[arg(long)]
    baseline_samples: Option<usize>,
    /// ADC channel 0-7 [default: 0]
    #[arg(long)]
    channel: Option<u8>,
    /// Replay the value column of a recorded CSV instead of live input
    #[arg(long, conflicts_with = "synthetic")]
    replay: Option<PathBuf>,
    /// Use the built-in synthetic shake
    #[arg(long)]
    synthetic: bool,
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Acceleration CSV to read
    #[arg(long, alias = "data_filename", default_value = "saved_CSVs/our_data.csv")]
    data_filename: PathBuf,
    /// Where to write the displacement series
    #[arg(long, alias = "results_filename", default_value = "saved_CSVs/displacement.csv")]
    results_filename: PathBuf,
    /// Results endpoint the final value is posted to
    #[arg(long, short = 'e')]
    endpoint: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse_from(expand_legacy_flags(std::env::args_os()));
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

/// Rewrite the recorder's two-letter flags (`-df`, `-rf`), which clap cannot
/// express as short options, to their long forms
fn expand_legacy_flags<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some("-df") => OsString::from("--data-filename"),
            Some("-rf") => OsString::from("--results-filename"),
            _ => arg,
        })
        .collect()
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Record(args) => run_record(args),
        Commands::Process(args) => run_process(args),
    }
}

fn load_config(path: Option<&Path>) -> AppConfig {
    path.map(AppConfig::load_from_file).unwrap_or_default()
}

fn run_record(args: RecordArgs) -> Result<ExitCode> {
    let mut config = load_config(args.config.as_deref()).capture;
    if let Some(before) = args.before {
        config.pre_trigger_samples = before;
    }
    if args.num.is_some() {
        config.max_samples = args.num;
    }
    if let Some(tolerance) = args.tolerance {
        config.trigger_tolerance = tolerance;
    }
    if let Some(end_tolerance) = args.end_tolerance {
        config.end_tolerance = end_tolerance;
    }
    if let Some(end_count) = args.end_count {
        config.end_tolerance_count = end_count;
    }
    if let Some(sleep_time) = args.sleep_time {
        config.sleep_secs = sleep_time;
    }
    if let Some(filename) = args.filename {
        config.output_path = filename;
    }
    if args.max_time.is_some() {
        config.max_duration_secs = args.max_time;
    }
    if let Some(baseline_samples) = args.baseline_samples {
        config.baseline_samples = baseline_samples;
    }
    if let Some(channel) = args.channel {
        config.channel = channel;
    }

    let mut source: Box<dyn SampleSource> = match (&args.replay, args.synthetic) {
        (Some(path), _) => Box::new(
            ReplaySource::from_csv(path, config.channel)
                .with_context(|| format!("loading replay {}", path.display()))?,
        ),
        (None, true) => Box::new(SyntheticSource::new(
            SyntheticSpec::default(),
            config.channel,
        )),
        (None, false) => bail!("no sample source: pass --replay <csv> or --synthetic"),
    };

    let output_path = config.output_path.clone();
    let mut session = CaptureSession::new(config).context("invalid capture settings")?;
    let mut clock = SystemClock::new();
    let mut sink = CsvSampleSink::new(&output_path);

    let report = match session.run(source.as_mut(), &mut clock, &mut sink) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Capture failed (code {}): {}", err.code(), err.message());
            return Ok(ExitCode::from(2));
        }
    };

    let payload = RecordPayload {
        output: &output_path,
        rows_written: sink.rows_written(),
        samples_per_second: report.samples_per_second(),
        report,
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(ExitCode::from(0))
}

fn run_process(args: ProcessArgs) -> Result<ExitCode> {
    let config = load_config(args.config.as_deref()).processing;
    let acceleration = Series::read_csv(&args.data_filename)
        .with_context(|| format!("reading {}", args.data_filename.display()))?;

    let mut estimator = DisplacementEstimator::new(&config);
    let mut sink = EndpointSink::new(args.endpoint);
    let report = match estimator.estimate_and_publish(&acceleration, &mut sink) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Processing failed (code {}): {}", err.code(), err.message());
            return Ok(ExitCode::from(2));
        }
    };

    report
        .displacement
        .write_csv(&args.results_filename)
        .with_context(|| format!("writing {}", args.results_filename.display()))?;

    let payload = ProcessPayload {
        input: &args.data_filename,
        output: &args.results_filename,
        samples: acceleration.len(),
        final_displacement: report.final_displacement,
        peak_displacement: report.peak_displacement,
        stages: &report.stages,
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
struct RecordPayload<'a> {
    output: &'a Path,
    rows_written: u64,
    samples_per_second: f64,
    #[serde(flatten)]
    report: shake_capture::capture::CaptureReport,
}

#[derive(Serialize)]
struct ProcessPayload<'a> {
    input: &'a Path,
    output: &'a Path,
    samples: usize,
    final_displacement: f64,
    peak_displacement: f64,
    stages: &'a [StageSummary],
}
