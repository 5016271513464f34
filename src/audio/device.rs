//! Input device enumeration
//!
//! Devices are indexed by their position in the host's full device list, so
//! an index printed by [`list_input_devices`] can be passed back on the
//! command line and resolved with [`get_input_device`].

use cpal::traits::{DeviceTrait, HostTrait};

use crate::error::AudioError;

/// An input-capable device as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDevice {
    /// Position in the host device list
    pub index: usize,
    pub name: String,
    /// Largest channel count among supported input configs
    pub max_input_channels: u16,
    pub is_default: bool,
}

/// Wrapper around a resolved cpal device
pub struct AudioDevice {
    info: InputDevice,
    device: cpal::Device,
}

impl AudioDevice {
    pub fn info(&self) -> &InputDevice {
        &self.info
    }

    pub fn into_inner(self) -> cpal::Device {
        self.device
    }
}

fn max_input_channels(device: &cpal::Device) -> u16 {
    device
        .supported_input_configs()
        .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
        .unwrap_or(0)
}

fn describe(index: usize, device: &cpal::Device, default_name: Option<&str>) -> Option<InputDevice> {
    let max_input_channels = max_input_channels(device);
    if max_input_channels == 0 {
        return None;
    }

    let name = device.name().unwrap_or_else(|_| format!("<unnamed device {}>", index));
    let is_default = default_name == Some(name.as_str());

    Some(InputDevice {
        index,
        name,
        max_input_channels,
        is_default,
    })
}

/// List every device of the default host that accepts input
pub fn list_input_devices() -> Result<Vec<InputDevice>, AudioError> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let devices = host
        .devices()?
        .enumerate()
        .filter_map(|(index, device)| describe(index, &device, default_name.as_deref()))
        .collect();

    Ok(devices)
}

/// Text printed when the program is started without a device index
pub fn render_device_list(devices: &[InputDevice]) -> String {
    let mut out = String::from("\n=== PCM POWER METER: AUDIO INPUT DEVICES ===\n");

    for device in devices {
        let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
        out.push_str(&format!("{:<7} | {}{}\n", device.index, device.name, default_marker));
    }
    if devices.is_empty() {
        out.push_str("(no input devices found)\n");
    }
    out.push_str("\nRun again with a device index to start the meter.\n");

    out
}

/// Resolve an index from [`list_input_devices`]
pub fn get_input_device(index: usize) -> Result<AudioDevice, AudioError> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let device = host
        .devices()?
        .nth(index)
        .ok_or(AudioError::DeviceNotFound(index))?;

    let info = describe(index, &device, default_name.as_deref())
        .ok_or(AudioError::DeviceNotFound(index))?;

    tracing::debug!("Resolved input device {}: {}", index, info.name);

    Ok(AudioDevice { info, device })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(index: usize, name: &str, is_default: bool) -> InputDevice {
        InputDevice {
            index,
            name: name.to_string(),
            max_input_channels: 2,
            is_default,
        }
    }

    #[test]
    fn test_render_device_list() {
        let text = render_device_list(&[
            device(0, "Built-in Microphone", true),
            device(3, "USB Audio CODEC", false),
        ]);

        assert!(text.contains("AUDIO INPUT DEVICES"));
        assert!(text.contains("0       | Built-in Microphone [DEFAULT]\n"));
        assert!(text.contains("3       | USB Audio CODEC\n"));
        assert!(!text.contains("no input devices"));
    }

    #[test]
    fn test_render_empty_device_list() {
        let text = render_device_list(&[]);
        assert!(text.contains("(no input devices found)"));
    }
}
