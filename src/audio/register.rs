//! Latest-reading register shared between the capture thread and clients
//!
//! The reading is an `f64` stored as its bit pattern in an `AtomicU64`, so a
//! publish is a single atomic store and readers can never observe a torn
//! value. Readers never block the writer or each other.

use std::sync::atomic::{AtomicU64, Ordering};

/// Single-writer, multi-reader holder of the most recent power reading
#[derive(Debug)]
pub struct ReadingRegister {
    bits: AtomicU64,
    publishes: AtomicU64,
}

impl ReadingRegister {
    /// Create a register holding 0.0
    pub fn new() -> Self {
        Self::with_initial(0.0)
    }

    pub fn with_initial(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
            publishes: AtomicU64::new(0),
        }
    }

    /// Replace the current reading
    #[inline]
    pub fn publish(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
        self.publishes.fetch_add(1, Ordering::Relaxed);
    }

    /// Most recently published reading, or the initial value
    #[inline]
    pub fn read(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Number of publishes so far
    pub fn publish_count(&self) -> u64 {
        self.publishes.load(Ordering::Relaxed)
    }
}

impl Default for ReadingRegister {
    fn default() -> Self {
        Self::new()
    }
}
