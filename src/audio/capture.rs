//! Audio capture from input devices
//!
//! cpal delivers samples through a callback on a driver thread. The callback
//! downmixes to mono i16 and hands the chunk to the capture loop over a
//! bounded channel; [`CpalSource::read_block`] reassembles those chunks into
//! fixed-size blocks. A full channel means the loop fell behind: the chunk is
//! dropped and counted instead of stalling the driver.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::audio::device::get_input_device;
use crate::audio::source::{CaptureFormat, CaptureSource};
use crate::constants::CAPTURE_CHANNEL_CAPACITY;
use crate::error::AudioError;

/// Capture from one cpal input device.
///
/// Holds the live `cpal::Stream`, which is not `Send` on every platform:
/// open and use it on the thread that runs the capture loop.
pub struct CpalSource {
    /// Kept alive for the lifetime of the source; dropping it closes the device
    _stream: cpal::Stream,

    chunk_rx: Receiver<Vec<i16>>,
    error_rx: Receiver<AudioError>,

    /// Samples received but not yet copied into a block
    pending: Vec<i16>,
    pending_pos: usize,

    /// Driver chunks dropped because the channel was full
    overflows: Arc<AtomicU64>,
}

impl CpalSource {
    /// Open device `device_index` and start capturing
    pub fn open(device_index: usize, format: CaptureFormat) -> Result<Self, AudioError> {
        let device = get_input_device(device_index)?;
        let device_name = device.info().name.clone();
        let device = device.into_inner();

        let (config, sample_format) = choose_config(&device, &format)?;

        let (chunk_tx, chunk_rx) = bounded::<Vec<i16>>(CAPTURE_CHANNEL_CAPACITY);
        let (error_tx, error_rx) = bounded::<AudioError>(16);
        let overflows = Arc::new(AtomicU64::new(0));

        let stream = match sample_format {
            SampleFormat::I16 => {
                build_stream::<i16>(&device, &config, chunk_tx, error_tx, overflows.clone())
            }
            SampleFormat::U16 => {
                build_stream::<u16>(&device, &config, chunk_tx, error_tx, overflows.clone())
            }
            SampleFormat::I32 => {
                build_stream::<i32>(&device, &config, chunk_tx, error_tx, overflows.clone())
            }
            SampleFormat::F32 => {
                build_stream::<f32>(&device, &config, chunk_tx, error_tx, overflows.clone())
            }
            other => Err(AudioError::UnsupportedConfig(format!(
                "sample format {:?}",
                other
            ))),
        }?;

        stream.play()?;

        tracing::info!(
            "Capturing from '{}' ({} Hz, {} ch, {:?})",
            device_name,
            config.sample_rate.0,
            config.channels,
            sample_format
        );

        Ok(Self {
            _stream: stream,
            chunk_rx,
            error_rx,
            pending: Vec::new(),
            pending_pos: 0,
            overflows,
        })
    }
}

impl CaptureSource for CpalSource {
    fn read_block(&mut self, block: &mut [i16]) -> Result<(), AudioError> {
        let mut filled = 0;

        while filled < block.len() {
            if let Ok(err) = self.error_rx.try_recv() {
                return Err(err);
            }

            if self.pending_pos < self.pending.len() {
                let n = (self.pending.len() - self.pending_pos).min(block.len() - filled);
                block[filled..filled + n]
                    .copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + n]);
                self.pending_pos += n;
                filled += n;
                continue;
            }

            select! {
                recv(self.chunk_rx) -> chunk => match chunk {
                    Ok(chunk) => {
                        self.pending = chunk;
                        self.pending_pos = 0;
                    }
                    Err(_) => return Err(AudioError::Closed),
                },
                recv(self.error_rx) -> err => {
                    return Err(err.unwrap_or(AudioError::Closed));
                }
            }
        }

        Ok(())
    }

    fn overflow_count(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }
}

/// Sample formats the callback can convert to i16
fn is_convertible(format: SampleFormat) -> bool {
    matches!(
        format,
        SampleFormat::I16 | SampleFormat::U16 | SampleFormat::I32 | SampleFormat::F32
    )
}

/// Pick a supported input config at the requested rate, preferring the
/// requested channel count and native i16 samples.
fn choose_config(
    device: &cpal::Device,
    format: &CaptureFormat,
) -> Result<(StreamConfig, SampleFormat), AudioError> {
    let rate = cpal::SampleRate(format.sample_rate);

    let range = device
        .supported_input_configs()
        .map_err(|e| AudioError::UnsupportedConfig(e.to_string()))?
        .filter(|r| r.min_sample_rate() <= rate && rate <= r.max_sample_rate())
        .filter(|r| is_convertible(r.sample_format()))
        .min_by_key(|r| {
            (
                r.channels() != format.channels,
                r.sample_format() != SampleFormat::I16,
                r.channels(),
            )
        })
        .ok_or_else(|| {
            AudioError::UnsupportedConfig(format!(
                "no i16/u16/i32/f32 input config at {} Hz",
                format.sample_rate
            ))
        })?;

    let config = StreamConfig {
        channels: range.channels(),
        sample_rate: rate,
        buffer_size: cpal::BufferSize::Default,
    };

    Ok((config, range.sample_format()))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    chunk_tx: Sender<Vec<i16>>,
    error_tx: Sender<AudioError>,
    overflows: Arc<AtomicU64>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    // Interleaved frames: keep the first channel only
    let channels = config.channels.max(1) as usize;

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let chunk: Vec<i16> = data
                .iter()
                .step_by(channels)
                .map(|&s| i16::from_sample(s))
                .collect();

            if chunk_tx.try_send(chunk).is_err() {
                overflows.fetch_add(1, Ordering::Relaxed);
            }
        },
        move |err| {
            let _ = error_tx.try_send(AudioError::from(err));
        },
        None,
    )?;

    Ok(stream)
}
