//! Capture source abstraction
//!
//! The capture loop only needs "fill this buffer with the next block, or
//! fail". The cpal implementation lives in [`crate::audio::capture`]; tests
//! drive the loop with scripted sources.

use crate::config::AudioConfig;
use crate::error::AudioError;

/// Format the device is opened with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl From<&AudioConfig> for CaptureFormat {
    fn from(config: &AudioConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            channels: config.channels,
        }
    }
}

/// Blocking source of mono i16 sample blocks
pub trait CaptureSource {
    /// Block until `block` is completely filled with the next samples.
    ///
    /// Any error is terminal for the source.
    fn read_block(&mut self, block: &mut [i16]) -> Result<(), AudioError>;

    /// Driver data dropped so far because the reader fell behind
    fn overflow_count(&self) -> u64 {
        0
    }
}

impl<S: CaptureSource + ?Sized> CaptureSource for Box<S> {
    fn read_block(&mut self, block: &mut [i16]) -> Result<(), AudioError> {
        (**self).read_block(block)
    }

    fn overflow_count(&self) -> u64 {
        (**self).overflow_count()
    }
}
