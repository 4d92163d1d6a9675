//! Fixed-capacity window of timestamped scalar measurements.

use std::collections::VecDeque;
use std::ops::Index;

use crate::imu::Timestamp;

/// A timestamped scalar sample of a rotation-magnitude signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub timestamp: Timestamp,
    pub value: f64,
}

impl Measurement {
    pub fn new(timestamp: Timestamp, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Ring buffer holding the most recent `capacity` measurements, oldest first.
///
/// Storage is reserved once at construction; pushing into a full buffer evicts
/// the oldest element. Timestamps are expected to be non-decreasing, which is
/// the caller's responsibility.
#[derive(Debug, Clone)]
pub struct MeasurementBuffer {
    window: VecDeque<Measurement>,
    capacity: usize,
}

impl MeasurementBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, measurement: Measurement) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(measurement);
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.window.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn front(&self) -> Option<&Measurement> {
        self.window.front()
    }

    pub fn back(&self) -> Option<&Measurement> {
        self.window.back()
    }

    pub fn get(&self, idx: usize) -> Option<&Measurement> {
        self.window.get(idx)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Measurement> + '_ {
        self.window.iter()
    }

    /// Signal values, oldest first.
    pub fn values(&self) -> impl ExactSizeIterator<Item = f64> + Clone + '_ {
        self.window.iter().map(|m| m.value)
    }
}

impl Index<usize> for MeasurementBuffer {
    type Output = Measurement;

    fn index(&self, idx: usize) -> &Measurement {
        &self.window[idx]
    }
}
