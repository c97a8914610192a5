//! Subcommand implementations

use std::time::Duration;

use anyhow::{Context, Result};
use pitchy_audio::CpalSource;
use pitchy_session::{FsStorage, SessionController, SessionError, Storage};
use tracing::{info, warn};

use crate::config::CliConfig;

/// Print the available input devices
pub fn devices(json: bool) -> Result<()> {
    let devices = CpalSource::list_devices().context("Failed to list audio devices")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    println!("Audio Input Devices:");
    for device in &devices {
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

/// Print pitch events as JSON lines until interrupted
pub async fn listen(config: &CliConfig, device: Option<usize>, seconds: Option<u64>) -> Result<()> {
    let session = open_session(config, device, false, FsStorage::new(config.recordings_dir()?))?;
    let events = session.events().context("Session has no event stream")?;

    let printer = tokio::task::spawn_blocking(move || {
        for event in events.iter() {
            match event.to_json_line() {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize pitch event: {}", e),
            }
        }
    });

    session.start().context("Failed to start capture")?;
    info!("Listening (Ctrl+C to stop)");

    wait_for_shutdown(seconds).await?;
    session.stop()?;

    let stats = session.stats();
    info!(
        "{} pitch event(s), {} block(s) skipped, {} event(s) evicted",
        stats.emitted_events, stats.dropped_jobs, stats.evicted_events
    );

    // Dropping the session ends the event stream
    drop(session);
    printer.await.context("Event printer failed")?;
    Ok(())
}

/// Record the full session to `<recordings_dir>/<id>.wav`
pub async fn record(
    config: &CliConfig,
    id: &str,
    device: Option<usize>,
    seconds: Option<u64>,
    slice_every: Option<u64>,
) -> Result<()> {
    let storage = FsStorage::new(config.recordings_dir()?);
    let session = open_session(config, device, true, storage.clone())?;

    session.start().context("Failed to start capture")?;
    info!("Recording {:?} (Ctrl+C to stop)", id);

    let shutdown = wait_for_shutdown(seconds);
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(Duration::from_secs(slice_every.unwrap_or(1)));
    ticker.tick().await;
    let mut slices = 0usize;

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                break;
            }
            _ = ticker.tick(), if slice_every.is_some() => {
                let slice = session.slice()?;
                if let Some(wav) = &slice.wav {
                    slices += 1;
                    let path = storage.write(&format!("{}-slice-{}", id, slices), wav.as_bytes())?;
                    info!("Slice {} ({:.0} ms) -> {}", slices, slice.duration, path.display());
                }
            }
        }
    }

    let result = match session.save_recording(id) {
        Ok(path) => {
            println!("{}", path.display());
            Ok(())
        }
        Err(SessionError::NoData) => {
            warn!("Nothing was captured");
            Ok(())
        }
        Err(e) => Err(e).context("Failed to save recording"),
    };

    session.stop()?;
    result
}

/// Print the effective configuration (or just its location)
pub fn show_config(config: &CliConfig, path_only: bool) -> Result<()> {
    if path_only {
        println!("{}", config.config_path.display());
    } else {
        print!("{}", config.to_toml()?);
    }
    Ok(())
}

fn open_session(
    config: &CliConfig,
    device: Option<usize>,
    record_full_audio: bool,
    storage: FsStorage,
) -> Result<SessionController> {
    let source = CpalSource::new(device.or(config.device_index));
    let session = SessionController::new(Box::new(source), Box::new(storage));

    let mut session_config = config.session.clone();
    session_config.record_full_audio |= record_full_audio;
    session
        .init(session_config)
        .context("Invalid session configuration")?;

    Ok(session)
}

async fn wait_for_shutdown(seconds: Option<u64>) -> Result<()> {
    match seconds {
        Some(seconds) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
                result = tokio::signal::ctrl_c() => {
                    result?;
                    info!("Received shutdown signal");
                }
            }
        }
        None => {
            tokio::signal::ctrl_c().await?;
            info!("Received shutdown signal");
        }
    }
    Ok(())
}
