//! Dedicated DSP thread
//!
//! Owns the engine for its whole life: reads a block, processes it, writes
//! it, and between blocks applies control commands received over a
//! crossbeam channel. A processing error halts the stream.

use crate::audio::io::{BlockSink, BlockSource, DiagnosticsSink, IoError, LogDiagnostics};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use speakerdsp_core::{Engine, ProcessingError, Sample, LEVEL_FLOOR_DBFS};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Control messages for the DSP thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DspCommand {
    EnableFilters,
    DisableFilters,
    /// Pause processing; levels read as silence while stopped
    Stop,
    Run,
    SetDither(bool),
    PublishDiagnostics,
    ResetMeters,
    Shutdown,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Failed to spawn DSP thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("DSP thread panicked")]
    Panicked,

    #[error("DSP thread is no longer running")]
    Disconnected,

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error(transparent)]
    Io(#[from] IoError),
}

/// Notified after every block with whether anything clipped
pub trait ClipIndicator: Send {
    fn set(&mut self, clipped: bool);
}

impl<F: FnMut(bool) + Send> ClipIndicator for F {
    fn set(&mut self, clipped: bool) {
        self(clipped)
    }
}

/// Why the loop ended
#[derive(Debug)]
pub enum ExitReason {
    Shutdown,
    EndOfStream,
    Failed(WorkerError),
}

/// Handed back by `DspWorker::join`
#[derive(Debug)]
pub struct WorkerExit {
    pub engine: Engine,
    pub blocks: u64,
    pub reason: ExitReason,
}

/// Configures and spawns a `DspWorker`
pub struct WorkerBuilder {
    engine: Engine,
    block_frames: usize,
    diagnostics: Box<dyn DiagnosticsSink>,
    clip_indicator: Option<Box<dyn ClipIndicator>>,
    filters_enabled: bool,
}

impl WorkerBuilder {
    /// Frames per read, capped at the engine's maximum block size
    pub fn block_frames(mut self, frames: usize) -> Self {
        self.block_frames = frames.clamp(1, self.engine.settings().max_block_frames);
        self
    }

    /// Initial filter state; `false` starts in bypass
    pub fn filters_enabled(mut self, enabled: bool) -> Self {
        self.filters_enabled = enabled;
        self
    }

    pub fn diagnostics(mut self, sink: impl DiagnosticsSink + 'static) -> Self {
        self.diagnostics = Box::new(sink);
        self
    }

    pub fn clip_indicator(mut self, indicator: impl ClipIndicator + 'static) -> Self {
        self.clip_indicator = Some(Box::new(indicator));
        self
    }

    pub fn spawn(
        self,
        source: impl BlockSource + 'static,
        sink: impl BlockSink + 'static,
    ) -> Result<DspWorker, WorkerError> {
        let (commands, receiver) = channel::unbounded();
        let blocks = Arc::new(AtomicU64::new(0));

        let state = WorkerLoop {
            block_len: self.block_frames * self.engine.channels().len(),
            engine: self.engine,
            source: Box::new(source),
            sink: Box::new(sink),
            diagnostics: self.diagnostics,
            clip_indicator: self.clip_indicator,
            commands: receiver,
            blocks: Arc::clone(&blocks),
            filters_enabled: self.filters_enabled,
            running: true,
        };

        let handle = std::thread::Builder::new()
            .name("speakerdsp-dsp".to_string())
            .spawn(move || state.run())
            .map_err(WorkerError::Spawn)?;

        info!(block_frames = self.block_frames, "DSP thread started");
        Ok(DspWorker {
            commands,
            blocks,
            handle: Some(handle),
        })
    }
}

/// Handle to the running DSP thread
pub struct DspWorker {
    commands: Sender<DspCommand>,
    blocks: Arc<AtomicU64>,
    handle: Option<JoinHandle<WorkerExit>>,
}

impl DspWorker {
    pub fn builder(engine: Engine) -> WorkerBuilder {
        WorkerBuilder {
            block_frames: engine.settings().max_block_frames,
            engine,
            diagnostics: Box::new(LogDiagnostics),
            clip_indicator: None,
            filters_enabled: true,
        }
    }

    pub fn send(&self, command: DspCommand) -> Result<(), WorkerError> {
        self.commands
            .send(command)
            .map_err(|_| WorkerError::Disconnected)
    }

    /// Blocks processed so far
    pub fn blocks_processed(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the thread to end and take the engine back
    pub fn join(mut self) -> Result<WorkerExit, WorkerError> {
        let handle = self.handle.take().ok_or(WorkerError::Disconnected)?;
        handle.join().map_err(|_| WorkerError::Panicked)
    }

    /// Ask the thread to stop, then join it
    pub fn shutdown(self) -> Result<WorkerExit, WorkerError> {
        // The thread may already have exited on its own
        let _ = self.commands.send(DspCommand::Shutdown);
        self.join()
    }
}

impl Drop for DspWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.commands.send(DspCommand::Shutdown);
            let _ = handle.join();
        }
    }
}

struct WorkerLoop {
    engine: Engine,
    source: Box<dyn BlockSource>,
    sink: Box<dyn BlockSink>,
    diagnostics: Box<dyn DiagnosticsSink>,
    clip_indicator: Option<Box<dyn ClipIndicator>>,
    commands: Receiver<DspCommand>,
    blocks: Arc<AtomicU64>,
    block_len: usize,
    filters_enabled: bool,
    running: bool,
}

/// Control flow after one step of the loop
enum Step {
    Continue,
    Exit(ExitReason),
}

impl WorkerLoop {
    fn run(mut self) -> WorkerExit {
        let mut input: Vec<Sample> = vec![0; self.block_len];
        let mut output: Vec<Sample> = vec![0; self.block_len];

        let reason = loop {
            if let Step::Exit(reason) = self.drain_commands() {
                break reason;
            }

            let step = if self.running {
                self.process_one(&mut input, &mut output)
            } else {
                self.idle()
            };
            if let Step::Exit(reason) = step {
                break reason;
            }
        };

        match &reason {
            ExitReason::Failed(e) => error!(error = %e, "DSP thread halted"),
            other => info!(reason = ?other, "DSP thread finished"),
        }

        WorkerExit {
            blocks: self.blocks.load(Ordering::Relaxed),
            engine: self.engine,
            reason,
        }
    }

    fn drain_commands(&mut self) -> Step {
        loop {
            match self.commands.try_recv() {
                Ok(command) => {
                    if let Step::Exit(reason) = self.apply(command) {
                        return Step::Exit(reason);
                    }
                }
                Err(TryRecvError::Empty) => return Step::Continue,
                Err(TryRecvError::Disconnected) => return Step::Exit(ExitReason::Shutdown),
            }
        }
    }

    fn apply(&mut self, command: DspCommand) -> Step {
        debug!(?command, "DSP command");
        match command {
            DspCommand::EnableFilters => self.filters_enabled = true,
            DspCommand::DisableFilters => self.filters_enabled = false,
            DspCommand::Stop => {
                self.running = false;
                self.publish_silence();
            }
            DspCommand::Run => self.running = true,
            DspCommand::SetDither(enabled) => self.engine.set_dither(enabled),
            DspCommand::PublishDiagnostics => {
                let report = self.engine.diagnostics();
                self.diagnostics.publish(&report);
            }
            DspCommand::ResetMeters => self.engine.reset_meters(),
            DspCommand::Shutdown => return Step::Exit(ExitReason::Shutdown),
        }
        Step::Continue
    }

    fn process_one(&mut self, input: &mut [Sample], output: &mut [Sample]) -> Step {
        let read = match self.source.read_block(input) {
            Ok(n) => n,
            Err(IoError::Closed) => return Step::Exit(ExitReason::EndOfStream),
            Err(IoError::Timeout(after)) => {
                warn!(?after, "Input underrun");
                return Step::Continue;
            }
            Err(e) => return Step::Exit(ExitReason::Failed(e.into())),
        };

        // A short final read is truncated to whole frames
        let width = self.engine.channels().len();
        let len = read - read % width;
        if len == 0 {
            return Step::Continue;
        }

        let outcome = match self
            .engine
            .process_block(&input[..len], &mut output[..len], self.filters_enabled)
        {
            Ok(outcome) => outcome,
            Err(e) => return Step::Exit(ExitReason::Failed(e.into())),
        };
        if let Some(indicator) = self.clip_indicator.as_mut() {
            indicator.set(outcome.clipped);
        }

        match self.sink.write_block(&output[..len]) {
            Ok(()) => {
                self.blocks.fetch_add(1, Ordering::Relaxed);
                Step::Continue
            }
            Err(IoError::Closed) => Step::Exit(ExitReason::EndOfStream),
            Err(e) => Step::Exit(ExitReason::Failed(e.into())),
        }
    }

    /// Wait one block period for a command while stopped
    fn idle(&mut self) -> Step {
        match self.commands.recv_timeout(self.engine.settings().block_period()) {
            Ok(command) => self.apply(command),
            Err(RecvTimeoutError::Timeout) => Step::Continue,
            Err(RecvTimeoutError::Disconnected) => Step::Exit(ExitReason::Shutdown),
        }
    }

    fn publish_silence(&mut self) {
        let mut report = self.engine.diagnostics();
        for channel in &mut report.channels {
            channel.in_max_level = 0;
            channel.out_max_level = 0;
            channel.in_level_dbfs = LEVEL_FLOOR_DBFS;
            channel.out_level_dbfs = LEVEL_FLOOR_DBFS;
        }
        self.diagnostics.publish(&report);
    }
}
