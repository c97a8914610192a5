//! List available audio input devices

use pitchy_audio::CpalSource;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Audio Input Devices:");
    for device in CpalSource::list_devices()? {
        println!(
            "  [{}] {}{} ({} ch @ {} Hz)",
            device.index,
            device.name,
            if device.is_default { " (default)" } else { "" },
            device.max_input_channels,
            device.default_sample_rate
        );
    }
    Ok(())
}
