//! Print the detected pitch of the default microphone for 5 seconds

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pitchy_audio::{AudioSource, CpalSource, FrameBlock, PitchDetector, DEFAULT_BUFFER_SIZE};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let detector = PitchDetector::default();
    let mut source = CpalSource::new(None);

    let rate = source.open(
        DEFAULT_BUFFER_SIZE,
        Arc::new(move |block: FrameBlock<'_>| {
            match detector.estimate(block.samples, block.sample_rate as f32, 0.01) {
                Some(pitch) => println!("{:8.2} Hz", pitch),
                None => println!("       -"),
            }
        }),
    )?;

    println!("=== Listening at {} Hz for 5 seconds ===", rate);
    thread::sleep(Duration::from_secs(5));
    source.close();

    Ok(())
}
