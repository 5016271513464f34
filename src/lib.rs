//! # PCM Power Meter
//!
//! Samples an audio input device, turns every capture block into a decibel
//! reading and pushes the latest reading to browsers over server-sent events.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌─────────────────┐
//! │ Input device │──▶│ Capture loop │──▶│ ReadingRegister │ (AtomicU64)
//! │    (cpal)    │   │ (own thread) │   │  single writer  │
//! └──────────────┘   └──────────────┘   └────────┬────────┘
//!                                                │ read()
//!                          ┌─────────────────────┼─────────────────────┐
//!                          ▼                     ▼                     ▼
//!                   ┌────────────┐        ┌────────────┐        ┌────────────┐
//!                   │ /events #1 │        │ /events #2 │  ...   │ /events #N │
//!                   └────────────┘        └────────────┘        └────────────┘
//!                     data: 42.3\n\n every 50 ms, one tokio task per client
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod ui;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Capture sample rate in Hz
    pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

    /// Capture channel count (mono)
    pub const DEFAULT_CHANNELS: u16 = 1;

    /// Samples per capture block (~170 ms at 48 kHz)
    pub const DEFAULT_BLOCK_SIZE: usize = 8192;

    /// HTTP port for the page and the event stream
    pub const DEFAULT_HTTP_PORT: u16 = 8080;

    /// Bind address for the web server (all interfaces)
    pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

    /// Interval between two event frames on one connection
    pub const DEFAULT_BROADCAST_INTERVAL_MS: u64 = 50;

    /// Capacity of the callback -> capture loop channel (in driver chunks)
    pub const CAPTURE_CHANNEL_CAPACITY: usize = 64;

    /// Author line shown in the page footer
    pub const AUTHOR_NAME: &str = "Edson Pereira, PY2SDR";

    /// Credit line shown under the author
    pub const ASSISTANT_CREDIT: &str = "Code Assistant: Gemini";
}
