//! tuner-listen - print the dominant frequency heard on the default microphone

use anyhow::{Context, Result};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::info;
use tuner_pitch::audio::input::list_input_devices;
use tuner_pitch::audio::LiveCapture;
use tuner_pitch::SessionConfig;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tuner_pitch=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut config = SessionConfig::default();
    let mut seconds: u64 = 30;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--list" | "-l" => return list_devices(),
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--frame-size" | "-n" => {
                let value = args.get(i + 1).context("--frame-size requires a value")?;
                config.estimator.frame_size = value
                    .parse()
                    .with_context(|| format!("Invalid frame size: {}", value))?;
                config.ring_capacity = config.estimator.frame_size * 8;
                i += 2;
                continue;
            }
            "--seconds" | "-s" => {
                let value = args.get(i + 1).context("--seconds requires a value")?;
                seconds = value
                    .parse()
                    .with_context(|| format!("Invalid duration: {}", value))?;
                i += 2;
                continue;
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                return Ok(());
            }
        }
    }

    // Configuration errors are reported once, before the device opens
    let mut capture = LiveCapture::new(config).context("Invalid configuration")?;

    let (tx, rx) = mpsc::channel::<f32>();
    let device = capture
        .start(move |freq: f32| {
            let _ = tx.send(freq);
        })
        .context("Failed to start capture")?;

    info!(
        device = %device.name,
        sample_rate = device.sample_rate,
        frame_size = capture.config().estimator.frame_size,
        "Listening"
    );

    let deadline = Instant::now() + Duration::from_secs(seconds);
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(remaining) {
            Ok(freq) => println!("{:8.2} Hz", freq),
            Err(mpsc::RecvTimeoutError::Timeout) => break,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    capture.stop();
    Ok(())
}

fn print_help() {
    println!("Usage: tuner-listen [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -l, --list              List available input devices");
    println!("  -n, --frame-size N      Samples per analysis frame, power of two (default: 2048)");
    println!("  -s, --seconds S         Listen for S seconds (default: 30)");
    println!("  -h, --help              Show this help");
    println!();
    println!("Set RUST_LOG=tuner_pitch=debug to see skipped frames.");
}

fn list_devices() -> Result<()> {
    let devices = list_input_devices()?;

    if devices.is_empty() {
        println!("No input devices found.");
    }
    for device in devices {
        println!(
            "{} ({} Hz, {} ch)",
            device.name, device.sample_rate, device.channels
        );
    }

    Ok(())
}
