//! Persistence of captured rows.
//!
//! The pre-trigger window is written first in overwrite mode; every
//! post-trigger sample is then appended. Rows are `timestamp,value` lines in
//! strictly increasing time order.

use std::fs::{self, File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::CaptureError;
use crate::series::{write_row, Sample};

/// Destination for capture rows
pub trait SampleSink {
    /// Replace any previous contents with the frozen pre-trigger window
    fn write_window(&mut self, window: &[Sample]) -> Result<(), CaptureError>;

    /// Append one post-trigger row
    fn append(&mut self, sample: &Sample) -> Result<(), CaptureError>;

    /// Flush whatever is buffered
    fn finish(&mut self) -> Result<(), CaptureError>;
}

/// CSV file sink; each row is flushed as soon as its line is complete
pub struct CsvSampleSink {
    path: PathBuf,
    writer: Option<LineWriter<File>>,
    rows_written: u64,
}

impl CsvSampleSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            writer: None,
            rows_written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    fn io_error(&self, action: &str, err: std::io::Error) -> CaptureError {
        CaptureError::Io {
            context: format!("{} {}", action, self.path.display()),
            details: err.to_string(),
        }
    }

    fn ensure_parent(&self) -> Result<(), CaptureError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
                .map_err(|err| self.io_error("creating directory for", err)),
            _ => Ok(()),
        }
    }
}

impl SampleSink for CsvSampleSink {
    fn write_window(&mut self, window: &[Sample]) -> Result<(), CaptureError> {
        self.ensure_parent()?;
        let file = File::create(&self.path).map_err(|err| self.io_error("creating", err))?;
        let mut writer = LineWriter::new(file);
        for sample in window {
            write_row(&mut writer, sample).map_err(|err| self.io_error("writing", err))?;
        }
        self.rows_written = window.len() as u64;
        self.writer = Some(writer);
        Ok(())
    }

    fn append(&mut self, sample: &Sample) -> Result<(), CaptureError> {
        if self.writer.is_none() {
            self.ensure_parent()?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|err| self.io_error("opening", err))?;
            self.writer = Some(LineWriter::new(file));
        }
        let result = match self.writer.as_mut() {
            Some(writer) => write_row(writer, sample),
            None => Ok(()),
        };
        result.map_err(|err| self.io_error("appending to", err))?;
        self.rows_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), CaptureError> {
        let result = match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        };
        result.map_err(|err| self.io_error("flushing", err))
    }
}

/// One write as seen by [`MemorySampleSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum SinkWrite {
    Window(Vec<Sample>),
    Row(Sample),
}

/// In-memory sink recording every write in order
#[derive(Debug, Default)]
pub struct MemorySampleSink {
    writes: Vec<SinkWrite>,
    finished: bool,
}

impl MemorySampleSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> &[SinkWrite] {
        &self.writes
    }

    /// Persisted rows as a file would hold them: last window, then appended rows
    pub fn rows(&self) -> Vec<Sample> {
        let mut rows = Vec::new();
        for write in &self.writes {
            match write {
                SinkWrite::Window(window) => {
                    rows.clear();
                    rows.extend_from_slice(window);
                }
                SinkWrite::Row(sample) => rows.push(*sample),
            }
        }
        rows
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl SampleSink for MemorySampleSink {
    fn write_window(&mut self, window: &[Sample]) -> Result<(), CaptureError> {
        self.writes.push(SinkWrite::Window(window.to_vec()));
        Ok(())
    }

    fn append(&mut self, sample: &Sample) -> Result<(), CaptureError> {
        self.writes.push(SinkWrite::Row(*sample));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), CaptureError> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Series;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("shake-storage-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_csv_sink_overwrites_then_appends() {
        let path = temp_path("overwrite.csv");
        let _ = fs::remove_file(&path);

        let mut sink = CsvSampleSink::new(&path);
        sink.write_window(&[Sample::new(0.0, 9.0)]).unwrap();
        // A second window replaces the first
        sink.write_window(&[Sample::new(0.0, 1.0), Sample::new(0.1, 2.0)])
            .unwrap();
        sink.append(&Sample::new(0.2, 3.0)).unwrap();
        sink.finish().unwrap();

        let series = Series::read_csv(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(series.values(), vec![1.0, 2.0, 3.0]);
        assert_eq!(sink.rows_written(), 3);
    }

    #[test]
    fn test_csv_sink_reports_io_error() {
        let dir = temp_path("is-a-directory");
        fs::create_dir_all(&dir).unwrap();

        let mut sink = CsvSampleSink::new(&dir);
        match sink.write_window(&[]) {
            Err(CaptureError::Io { context, .. }) => assert!(context.contains("creating")),
            other => panic!("Expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn test_memory_sink_rows_follow_file_semantics() {
        let mut sink = MemorySampleSink::new();
        sink.append(&Sample::new(0.0, 7.0)).unwrap();
        sink.write_window(&[Sample::new(1.0, 1.0)]).unwrap();
        sink.append(&Sample::new(2.0, 2.0)).unwrap();
        sink.finish().unwrap();

        assert_eq!(sink.rows(), vec![Sample::new(1.0, 1.0), Sample::new(2.0, 2.0)]);
        assert_eq!(sink.writes().len(), 3);
        assert!(sink.is_finished());
    }
}
