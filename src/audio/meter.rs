//! Capture loop: source -> power estimate -> register
//!
//! Runs on its own thread for the life of the process. The first error from
//! the source ends the loop and releases the device; the register keeps the
//! last published reading and clients keep receiving it. There is no retry.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::audio::power::block_power_db;
use crate::audio::register::ReadingRegister;
use crate::audio::source::CaptureSource;
use crate::error::AudioError;

/// Counters shared between the capture thread and observers
#[derive(Debug, Default)]
pub struct CaptureStats {
    blocks: AtomicU64,
    running: AtomicBool,
}

impl CaptureStats {
    /// Blocks measured and published
    pub fn blocks(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }

    /// True while the loop is reading from the device
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Read, measure and publish until the source fails.
///
/// Returns the error that ended the loop.
pub fn run_capture_loop<S: CaptureSource + ?Sized>(
    source: &mut S,
    register: &ReadingRegister,
    block_size: usize,
    stats: &CaptureStats,
) -> AudioError {
    let mut block = vec![0i16; block_size];

    stats.running.store(true, Ordering::SeqCst);

    let err = loop {
        if let Err(e) = source.read_block(&mut block) {
            break e;
        }

        register.publish(block_power_db(&block));
        stats.blocks.fetch_add(1, Ordering::Relaxed);
    };

    stats.running.store(false, Ordering::SeqCst);
    err
}

/// Handle to the detached capture thread
pub struct CaptureHandle {
    stats: Arc<CaptureStats>,
    thread: JoinHandle<()>,
}

impl CaptureHandle {
    pub fn stats(&self) -> Arc<CaptureStats> {
        self.stats.clone()
    }

    /// Wait for the loop to end. The binary never does this.
    pub fn join(self) {
        let _ = self.thread.join();
    }
}

/// Start the capture thread.
///
/// `open` runs on the new thread, since a cpal stream must stay on the thread
/// that created it. Its result is reported back before this returns, so an
/// invalid device surfaces here as a startup error.
pub fn spawn_capture_thread<F, S>(
    open: F,
    register: Arc<ReadingRegister>,
    block_size: usize,
) -> Result<CaptureHandle, AudioError>
where
    F: FnOnce() -> Result<S, AudioError> + Send + 'static,
    S: CaptureSource + 'static,
{
    let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), AudioError>>(1);
    let stats = Arc::new(CaptureStats::default());
    let thread_stats = stats.clone();

    let thread = thread::Builder::new()
        .name("capture".into())
        .spawn(move || {
            let mut source = match open() {
                Ok(source) => {
                    let _ = ready_tx.send(Ok(()));
                    source
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            let err = run_capture_loop(&mut source, &register, block_size, &thread_stats);

            tracing::error!(
                "Capture stopped after {} blocks ({} overflows): {}; serving last reading {:.1}",
                thread_stats.blocks(),
                source.overflow_count(),
                err,
                register.read()
            );

            drop(source);
            tracing::debug!("Capture device released");
        })
        .map_err(|e| AudioError::StreamError(e.to_string()))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(CaptureHandle { stats, thread }),
        Ok(Err(e)) => {
            let _ = thread.join();
            Err(e)
        }
        // Thread died before reporting
        Err(_) => Err(AudioError::Closed),
    }
}
