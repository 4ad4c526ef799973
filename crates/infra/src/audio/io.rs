//! Block I/O seams around the engine
//!
//! The DSP thread reads interleaved storage words from a `BlockSource`,
//! hands them to the engine and writes the result to a `BlockSink`.
//! Reports go to a `DiagnosticsSink`.

use speakerdsp_core::{EngineReport, Sample};
use std::io::Write;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("No block within {0:?}")]
    Timeout(Duration),

    #[error("Stream closed")]
    Closed,

    #[error("Block of {len} samples exceeds queue capacity {capacity}")]
    Overflow { len: usize, capacity: usize },

    #[error("Device error: {0}")]
    Device(String),
}

/// Supplier of interleaved input blocks
pub trait BlockSource: Send {
    /// Fill `buf`, returning the number of samples written into it.
    /// `IoError::Closed` marks the end of the stream.
    fn read_block(&mut self, buf: &mut [Sample]) -> Result<usize, IoError>;
}

/// Consumer of interleaved output blocks
pub trait BlockSink: Send {
    fn write_block(&mut self, buf: &[Sample]) -> Result<(), IoError>;
}

/// Receiver of diagnostics reports
pub trait DiagnosticsSink: Send {
    fn publish(&mut self, report: &EngineReport);
}

/// Serves a pre-recorded buffer block by block
#[derive(Debug, Clone)]
pub struct SliceSource {
    samples: Vec<Sample>,
    position: usize,
}

impl SliceSource {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples,
            position: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.samples.len() - self.position
    }
}

impl BlockSource for SliceSource {
    fn read_block(&mut self, buf: &mut [Sample]) -> Result<usize, IoError> {
        let n = buf.len().min(self.remaining());
        if n == 0 && !buf.is_empty() {
            return Err(IoError::Closed);
        }
        buf[..n].copy_from_slice(&self.samples[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }
}

/// Collects every written block
#[derive(Debug, Clone, Default)]
pub struct VecSink {
    samples: Vec<Sample>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn into_inner(self) -> Vec<Sample> {
        self.samples
    }
}

impl BlockSink for VecSink {
    fn write_block(&mut self, buf: &[Sample]) -> Result<(), IoError> {
        self.samples.extend_from_slice(buf);
        Ok(())
    }
}

/// Discards output
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl BlockSink for NullSink {
    fn write_block(&mut self, _buf: &[Sample]) -> Result<(), IoError> {
        Ok(())
    }
}

/// Emits reports as structured log events
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl DiagnosticsSink for LogDiagnostics {
    fn publish(&mut self, report: &EngineReport) {
        for channel in &report.channels {
            info!(
                channel = %channel.label(),
                name = %channel.name,
                in_dbfs = channel.in_level_dbfs,
                out_dbfs = channel.out_level_dbfs,
                in_clips = channel.in_clip_count,
                out_clips = channel.out_clip_count,
                "Channel levels"
            );
        }
    }
}

/// Writes one JSON report per line
pub struct JsonDiagnostics<W> {
    writer: W,
}

impl<W: Write + Send> JsonDiagnostics<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> DiagnosticsSink for JsonDiagnostics<W> {
    fn publish(&mut self, report: &EngineReport) {
        let written = report
            .to_json()
            .map_err(|e| e.to_string())
            .and_then(|line| writeln!(self.writer, "{line}").map_err(|e| e.to_string()));
        if let Err(e) = written {
            warn!(error = %e, "Failed to write diagnostics report");
        }
    }
}

/// Forwards reports to another thread
impl DiagnosticsSink for crossbeam::channel::Sender<EngineReport> {
    fn publish(&mut self, report: &EngineReport) {
        if self.send(report.clone()).is_err() {
            warn!("Diagnostics receiver dropped");
        }
    }
}
