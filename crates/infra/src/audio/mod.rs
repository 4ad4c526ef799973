//! Audio plumbing around the engine: block I/O, sample queues and the DSP thread

pub mod io;
pub mod lockfree_buffer;
pub mod worker;

pub use io::{
    BlockSink, BlockSource, DiagnosticsSink, IoError, JsonDiagnostics, LogDiagnostics, NullSink,
    SliceSource, VecSink,
};
pub use lockfree_buffer::{BlockConsumer, BlockProducer, LockFreeBlockQueue, QueueSink, QueueSource};
pub use worker::{ClipIndicator, DspCommand, DspWorker, ExitReason, WorkerBuilder, WorkerError, WorkerExit};
