//! Lock-free sample queue between the driver side and the DSP thread
//!
//! A single-producer single-consumer ring of `i32` storage words. Positions
//! are monotonic counters in cache-padded atomics; the slot index is the
//! position masked by the power-of-two capacity.
//!
//! Performance characteristics:
//! - Lock-free, wait-free for the single producer and consumer
//! - No allocations after construction
//! - Blocking adapters spin with `crossbeam::utils::Backoff`

use crate::audio::io::{BlockSink, BlockSource, IoError};
use crossbeam::utils::{Backoff, CachePadded};
use speakerdsp_core::Sample;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Shared {
    buffer: Box<[AtomicI32]>,
    write_pos: CachePadded<AtomicUsize>,
    read_pos: CachePadded<AtomicUsize>,
    producer_alive: AtomicBool,
    consumer_alive: AtomicBool,
    mask: usize,
}

impl Shared {
    fn capacity(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    fn len(&self) -> usize {
        let write_pos = self.write_pos.load(Ordering::Acquire);
        let read_pos = self.read_pos.load(Ordering::Acquire);
        write_pos.wrapping_sub(read_pos)
    }
}

/// Constructor for a producer/consumer pair sharing one ring
pub struct LockFreeBlockQueue;

impl LockFreeBlockQueue {
    /// Create a queue holding at least `capacity` samples
    ///
    /// Capacity is rounded up to the next power of 2.
    #[allow(clippy::new_ret_no_self)]
    pub fn with_capacity(capacity: usize) -> (BlockProducer, BlockConsumer) {
        let capacity = capacity.max(1).next_power_of_two();
        let shared = Arc::new(Shared {
            buffer: (0..capacity).map(|_| AtomicI32::new(0)).collect(),
            write_pos: CachePadded::new(AtomicUsize::new(0)),
            read_pos: CachePadded::new(AtomicUsize::new(0)),
            producer_alive: AtomicBool::new(true),
            consumer_alive: AtomicBool::new(true),
            mask: capacity - 1,
        });

        (
            BlockProducer {
                shared: Arc::clone(&shared),
            },
            BlockConsumer { shared },
        )
    }
}

/// Writing half of the queue
pub struct BlockProducer {
    shared: Arc<Shared>,
}

impl BlockProducer {
    /// Write as many samples as fit; returns the number written
    pub fn write(&mut self, samples: &[Sample]) -> usize {
        let shared = &*self.shared;
        let write_pos = shared.write_pos.load(Ordering::Relaxed);
        let available = shared.capacity() - shared.len();
        let to_write = samples.len().min(available);

        for (i, sample) in samples[..to_write].iter().enumerate() {
            let slot = (write_pos.wrapping_add(i)) & shared.mask;
            shared.buffer[slot].store(*sample, Ordering::Relaxed);
        }

        // Release publishes the slot stores to the consumer
        shared
            .write_pos
            .store(write_pos.wrapping_add(to_write), Ordering::Release);
        to_write
    }

    pub fn available_write(&self) -> usize {
        self.shared.capacity() - self.shared.len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// The consumer has been dropped
    pub fn is_closed(&self) -> bool {
        !self.shared.consumer_alive.load(Ordering::Acquire)
    }
}

impl Drop for BlockProducer {
    fn drop(&mut self) {
        self.shared.producer_alive.store(false, Ordering::Release);
    }
}

/// Reading half of the queue
pub struct BlockConsumer {
    shared: Arc<Shared>,
}

impl BlockConsumer {
    /// Read up to `out.len()` samples; returns the number read
    pub fn read(&mut self, out: &mut [Sample]) -> usize {
        let shared = &*self.shared;
        let read_pos = shared.read_pos.load(Ordering::Relaxed);
        let to_read = out.len().min(shared.len());

        for (i, sample) in out[..to_read].iter_mut().enumerate() {
            let slot = (read_pos.wrapping_add(i)) & shared.mask;
            *sample = shared.buffer[slot].load(Ordering::Relaxed);
        }

        shared
            .read_pos
            .store(read_pos.wrapping_add(to_read), Ordering::Release);
        to_read
    }

    pub fn available_read(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// The producer has been dropped
    pub fn is_closed(&self) -> bool {
        !self.shared.producer_alive.load(Ordering::Acquire)
    }

    /// Drain everything currently queued
    pub fn drain(&mut self) -> Vec<Sample> {
        let mut out = vec![0; self.available_read()];
        let n = self.read(&mut out);
        out.truncate(n);
        out
    }
}

impl Drop for BlockConsumer {
    fn drop(&mut self) {
        self.shared.consumer_alive.store(false, Ordering::Release);
    }
}

// ============================================================================
// BLOCKING ADAPTERS
// ============================================================================

/// Waits with exponential backoff until `ready` or the deadline passes
fn wait_until(timeout: Duration, mut ready: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    let backoff = Backoff::new();

    while !ready() {
        if Instant::now() >= deadline {
            return false;
        }
        if backoff.is_completed() {
            std::thread::yield_now();
        } else {
            backoff.snooze();
        }
    }
    true
}

/// `BlockSource` reading full blocks from a queue
pub struct QueueSource {
    consumer: BlockConsumer,
    timeout: Duration,
}

impl QueueSource {
    pub fn new(consumer: BlockConsumer, timeout: Duration) -> Self {
        Self { consumer, timeout }
    }
}

impl BlockSource for QueueSource {
    /// Blocks until `buf` can be filled. After the producer hangs up the
    /// remaining samples are returned, then `IoError::Closed`.
    fn read_block(&mut self, buf: &mut [Sample]) -> Result<usize, IoError> {
        let consumer = &self.consumer;
        let ready = wait_until(self.timeout, || {
            consumer.available_read() >= buf.len() || consumer.is_closed()
        });
        if !ready {
            return Err(IoError::Timeout(self.timeout));
        }

        match self.consumer.read(buf) {
            0 if self.consumer.is_closed() && !buf.is_empty() => Err(IoError::Closed),
            n => Ok(n),
        }
    }
}

/// `BlockSink` writing whole blocks into a queue
pub struct QueueSink {
    producer: BlockProducer,
    timeout: Duration,
}

impl QueueSink {
    pub fn new(producer: BlockProducer, timeout: Duration) -> Self {
        Self { producer, timeout }
    }
}

impl BlockSink for QueueSink {
    fn write_block(&mut self, buf: &[Sample]) -> Result<(), IoError> {
        if buf.len() > self.producer.capacity() {
            return Err(IoError::Overflow {
                len: buf.len(),
                capacity: self.producer.capacity(),
            });
        }

        let producer = &self.producer;
        let ready = wait_until(self.timeout, || {
            producer.available_write() >= buf.len() || producer.is_closed()
        });
        if self.producer.is_closed() {
            return Err(IoError::Closed);
        }
        if !ready {
            return Err(IoError::Timeout(self.timeout));
        }

        self.producer.write(buf);
        Ok(())
    }
}
