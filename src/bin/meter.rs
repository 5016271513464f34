//! PCM Power Meter
//!
//! Without arguments, prints the input devices and exits. With a device
//! index, captures from that device and serves the live reading on
//! http://0.0.0.0:8080 until interrupted.

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pcm_power_meter::{
    audio::{
        list_input_devices, render_device_list, spawn_capture_thread, CaptureFormat, CpalSource,
        ReadingRegister,
    },
    config::{MeterConfig, StartupMode},
    ui::WebServer,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let device_index = match StartupMode::from_args(std::env::args().skip(1))? {
        StartupMode::ListDevices => {
            print_devices()?;
            return Ok(());
        }
        StartupMode::Meter { device_index } => device_index,
    };

    tracing::info!("Starting PCM Power Meter on input device {}", device_index);

    let config = MeterConfig::load_or_default()?;
    let register = Arc::new(ReadingRegister::new());

    // Open errors (bad index, busy device) end the process before serving
    let format = CaptureFormat::from(&config.audio);
    let capture = spawn_capture_thread(
        move || CpalSource::open(device_index, format),
        register.clone(),
        config.audio.block_size,
    )?;
    tracing::info!(
        "Capture running: {} samples per block ({:.0} ms)",
        config.audio.block_size,
        config.audio.block_duration().as_secs_f64() * 1000.0
    );

    let web_server = WebServer::new(register, config.ui.clone())?;

    tokio::select! {
        result = web_server.start() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(
                "Interrupted, shutting down ({} blocks measured)",
                capture.stats().blocks()
            );
        }
    }

    Ok(())
}

fn print_devices() -> Result<()> {
    let devices = list_input_devices()?;
    print!("{}", render_device_list(&devices));
    Ok(())
}
