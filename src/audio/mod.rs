//! Audio side of the meter
//!
//! Capture, power estimation and the register the readings are published to.

pub mod capture;
pub mod device;
pub mod meter;
pub mod power;
pub mod register;
pub mod source;

pub use capture::CpalSource;
pub use device::{
    get_input_device, list_input_devices, render_device_list, AudioDevice, InputDevice,
};
pub use meter::{run_capture_loop, spawn_capture_thread, CaptureHandle, CaptureStats};
pub use power::{block_power_db, format_reading};
pub use register::ReadingRegister;
pub use source::{CaptureFormat, CaptureSource};
