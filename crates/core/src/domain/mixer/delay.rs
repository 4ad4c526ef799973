//! Per-channel delay line
//!
//! A fixed-capacity ring buffer: each sample reads the oldest slot, then
//! overwrites it with the incoming value. Storage is reserved once at load
//! time for the largest delay the engine allows.

use std::collections::TryReserveError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayLine {
    buffer: Vec<i32>,
    offset: usize,
}

impl DelayLine {
    /// Reserve `capacity` slots and activate the first `delay_samples` of them.
    ///
    /// `delay_samples` is clamped to `capacity`. A length of zero makes the
    /// line a pass-through.
    pub fn new(capacity: usize, delay_samples: usize) -> Result<Self, TryReserveError> {
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(capacity)?;
        buffer.resize(delay_samples.min(capacity), 0);
        Ok(Self { buffer, offset: 0 })
    }

    /// Active delay in samples
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Push `input` and return the value written `len()` samples earlier
    #[inline]
    pub fn process(&mut self, input: i32) -> i32 {
        match self.buffer.get_mut(self.offset) {
            Some(slot) => {
                let delayed = std::mem::replace(slot, input);
                self.offset += 1;
                if self.offset == self.buffer.len() {
                    self.offset = 0;
                }
                delayed
            }
            None => input,
        }
    }

    /// Zero the stored samples without changing the length
    pub fn clear(&mut self) {
        self.buffer.fill(0);
        self.offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_length_is_pass_through() {
        let mut line = DelayLine::new(16, 0).unwrap();
        assert!(line.is_empty());
        assert_eq!(line.process(7), 7);
        assert_eq!(line.process(-3), -3);
    }

    #[test]
    fn test_impulse_emerges_after_delay() {
        let mut line = DelayLine::new(16, 3).unwrap();
        let out: Vec<i32> = [1, 0, 0, 0, 0, 0, 0]
            .into_iter()
            .map(|x| line.process(x))
            .collect();
        assert_eq!(out, vec![0, 0, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn test_wraps_repeatedly() {
        let mut line = DelayLine::new(4, 2).unwrap();
        let out: Vec<i32> = (1..=8).map(|x| line.process(x)).collect();
        assert_eq!(out, vec![0, 0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_length_clamped_to_capacity() {
        let line = DelayLine::new(4, 10).unwrap();
        assert_eq!(line.len(), 4);
        assert!(line.capacity() >= 4);
    }

    #[test]
    fn test_clear_zeroes_history() {
        let mut line = DelayLine::new(8, 2).unwrap();
        line.process(5);
        line.process(6);
        line.clear();
        assert_eq!(line.process(1), 0);
        assert_eq!(line.process(2), 0);
        assert_eq!(line.process(3), 1);
    }
}
