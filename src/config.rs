//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
    /// Capture configuration
    pub audio: AudioConfig,

    /// Web server configuration
    pub ui: UiConfig,
}

/// Capture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture sample rate
    pub sample_rate: u32,

    /// Channel count requested from the device
    pub channels: u16,

    /// Samples per capture block
    pub block_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl AudioConfig {
    /// Duration of one capture block
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(self.block_size as f64 / self.sample_rate as f64)
    }
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// HTTP server port
    pub http_port: u16,

    /// Bind address for web server
    pub bind_address: String,

    /// Milliseconds between two event frames
    pub broadcast_interval_ms: u64,

    /// Author line for the page footer
    pub author: String,

    /// Credit line for the page footer
    pub credit: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            broadcast_interval_ms: DEFAULT_BROADCAST_INTERVAL_MS,
            author: AUTHOR_NAME.to_string(),
            credit: ASSISTANT_CREDIT.to_string(),
        }
    }
}

impl UiConfig {
    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }
}

impl MeterConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load the file at [`MeterConfig::default_path`] when it exists, defaults otherwise
    pub fn load_or_default() -> crate::Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => {
                tracing::info!("Loading configuration from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Get default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("net", "py2sdr", "pcm-power-meter")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn validate(&self) -> crate::Result<()> {
        if self.audio.block_size == 0 {
            return Err(crate::Error::Config("audio.block_size must be > 0".into()));
        }
        if self.audio.sample_rate == 0 {
            return Err(crate::Error::Config("audio.sample_rate must be > 0".into()));
        }
        if self.audio.channels == 0 {
            return Err(crate::Error::Config("audio.channels must be > 0".into()));
        }
        if self.ui.broadcast_interval_ms == 0 {
            return Err(crate::Error::Config(
                "ui.broadcast_interval_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// What the process does, decided by its single optional argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupMode {
    /// No argument: print input devices and exit
    ListDevices,
    /// Device index given: capture and serve
    Meter { device_index: usize },
}

impl StartupMode {
    /// Decide from the arguments after the program name
    pub fn from_args<I, S>(args: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match args.into_iter().next() {
            None => Ok(StartupMode::ListDevices),
            Some(arg) => {
                let arg = arg.as_ref();
                arg.trim()
                    .parse::<usize>()
                    .map(|device_index| StartupMode::Meter { device_index })
                    .map_err(|_| {
                        crate::Error::InvalidArgument(format!(
                            "device index must be a non-negative integer, got {:?}",
                            arg
                        ))
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = MeterConfig::default();
        assert_eq!(config.audio.sample_rate, 48000);
        assert_eq!(config.audio.channels, 1);
        assert_eq!(config.audio.block_size, 8192);
        assert_eq!(config.ui.http_port, 8080);
        assert_eq!(config.ui.bind_address, "0.0.0.0");
        assert_eq!(config.ui.broadcast_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_block_duration() {
        let ms = AudioConfig::default().block_duration().as_secs_f64() * 1000.0;
        assert!((ms - 170.67).abs() < 0.01);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MeterConfig::from_toml_str("[ui]\nhttp_port = 9090\n").unwrap();
        assert_eq!(config.ui.http_port, 9090);
        assert_eq!(config.ui.bind_address, "0.0.0.0");
        assert_eq!(config.audio, AudioConfig::default());
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(matches!(
            MeterConfig::from_toml_str("[audio]\nblock_size = 0\n"),
            Err(crate::Error::Config(_))
        ));
        assert!(matches!(
            MeterConfig::from_toml_str("[audio\n"),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_startup_mode() {
        let none: [&str; 0] = [];
        assert_eq!(StartupMode::from_args(none).unwrap(), StartupMode::ListDevices);
        assert_eq!(
            StartupMode::from_args(["3"]).unwrap(),
            StartupMode::Meter { device_index: 3 }
        );
        assert!(matches!(
            StartupMode::from_args(["mic"]),
            Err(crate::Error::InvalidArgument(_))
        ));
        assert!(StartupMode::from_args(["-1"]).is_err());
    }
}
