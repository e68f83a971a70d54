//! Microphone capture using cpal
//!
//! Channel 0 of every callback buffer is pushed into the sample ring buffer.

use super::adapter::i16_sample_to_f32;
use super::buffer::SampleProducer;
use crate::spectrum::ConfigError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No audio input device found")]
    NoDevice,

    #[error("Failed to get device name: {0}")]
    DeviceName(String),

    #[error("Failed to get default config: {0}")]
    DefaultConfig(String),

    #[error("Unsupported input sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("Failed to build stream: {0}")]
    BuildStream(String),

    #[error("Failed to play stream: {0}")]
    PlayStream(String),

    #[error("Capture is already running")]
    AlreadyRunning,

    #[error("Invalid capture configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Audio input device information
#[derive(Debug, Clone)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Audio input stream
pub struct AudioInput {
    stream: Stream,
    device_info: AudioDeviceInfo,
}

impl AudioInput {
    /// Open the default input device
    ///
    /// # Arguments
    /// * `producer` - Ring buffer end that receives channel 0
    pub fn from_default_device(producer: SampleProducer) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(AudioError::NoDevice)?;

        Self::from_device(device, producer)
    }

    /// Open a specific input device at its default configuration
    ///
    /// The sample rate is whatever the device reports; the session adapts to it.
    pub fn from_device(device: Device, mut producer: SampleProducer) -> Result<Self, AudioError> {
        let name = device
            .name()
            .map_err(|e| AudioError::DeviceName(e.to_string()))?;

        let config = device
            .default_input_config()
            .map_err(|e| AudioError::DefaultConfig(e.to_string()))?;

        let sample_format = config.sample_format();
        let device_info = AudioDeviceInfo {
            name,
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
        };

        let stream_config: StreamConfig = config.into();
        // step_by(0) would panic inside the callback
        let channels = (device_info.channels as usize).max(1);

        let err_fn = |err: cpal::StreamError| tracing::error!(error = %err, "Audio input stream error");

        let stream = match sample_format {
            SampleFormat::F32 => device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    producer.write_iter(data.iter().step_by(channels).copied());
                },
                err_fn,
                None,
            ),
            SampleFormat::I16 => device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    producer.write_iter(data.iter().step_by(channels).map(|&s| i16_sample_to_f32(s)));
                },
                err_fn,
                None,
            ),
            other => return Err(AudioError::UnsupportedSampleFormat(format!("{other:?}"))),
        }
        .map_err(|e| AudioError::BuildStream(e.to_string()))?;

        tracing::info!(
            device = %device_info.name,
            sample_rate = device_info.sample_rate,
            channels = device_info.channels,
            format = ?sample_format,
            "Opened audio input"
        );

        Ok(Self {
            stream,
            device_info,
        })
    }

    /// Start capturing audio
    pub fn start(&self) -> Result<(), AudioError> {
        self.stream
            .play()
            .map_err(|e| AudioError::PlayStream(e.to_string()))
    }

    /// Pause audio capture
    pub fn pause(&self) -> Result<(), AudioError> {
        self.stream
            .pause()
            .map_err(|e| AudioError::PlayStream(e.to_string()))
    }

    /// Get device information
    pub fn device_info(&self) -> &AudioDeviceInfo {
        &self.device_info
    }
}

/// List available audio input devices
pub fn list_input_devices() -> Result<Vec<AudioDeviceInfo>, AudioError> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    let device_iter = host
        .input_devices()
        .map_err(|e| AudioError::DeviceName(e.to_string()))?;

    for device in device_iter {
        if let (Ok(name), Ok(config)) = (device.name(), device.default_input_config()) {
            devices.push(AudioDeviceInfo {
                name,
                sample_rate: config.sample_rate().0,
                channels: config.channels(),
            });
        }
    }

    Ok(devices)
}
