//! List audio devices usable for recording and playback.

use crate::recording::devices::{list_devices, suppress_alsa_warnings, Direction};
use cpal::traits::{DeviceTrait, HostTrait};

/// Prints the input and output devices with the IDs accepted in the config file.
///
/// # Errors
/// - If the audio host cannot enumerate devices
pub fn handle_list_devices() -> Result<(), anyhow::Error> {
    let (host, inputs, outputs) = suppress_alsa_warnings(|| {
        let host = cpal::default_host();
        let inputs = list_devices(&host, Direction::Input)?;
        let outputs = list_devices(&host, Direction::Output)?;
        Ok((host, inputs, outputs))
    })?;

    let default_input = host.default_input_device().and_then(|d| d.name().ok());
    let default_output = host.default_output_device().and_then(|d| d.name().ok());

    println!();
    print_section("Input devices (audio.input_device)", &inputs, default_input, true);
    print_section("Output devices (audio.output_device)", &outputs, default_output, false);

    Ok(())
}

fn print_section(title: &str, devices: &[cpal::Device], default_name: Option<String>, input: bool) {
    println!("{title}:");
    println!();

    if devices.is_empty() {
        println!("  (none found)");
        println!();
        return;
    }

    for (index, device) in devices.iter().enumerate() {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let default_indicator = if default_name.as_deref() == Some(name.as_str()) {
            " [DEFAULT]"
        } else {
            ""
        };

        let config = if input {
            device.default_input_config()
        } else {
            device.default_output_config()
        };
        let config_info = match config {
            Ok(config) => format!("{}Hz, {} channels", config.sample_rate().0, config.channels()),
            Err(_) => "configuration unavailable".to_string(),
        };

        println!("  ID: {index}");
        println!("    Name: {name}{default_indicator}");
        println!("    Config: {config_info}");
        println!();
    }
}
