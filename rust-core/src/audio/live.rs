//! Live microphone analysis
//!
//! Device callback → ring buffer → analysis thread → `FrequencySink`.
//! The analysis thread owns the `CaptureSession`; nothing else touches it.

use super::buffer::SampleRingBuffer;
use super::input::{AudioDeviceInfo, AudioError, AudioInput};
use super::session::{CaptureSession, FrequencySink, SessionConfig, SessionStats};
use crate::spectrum::ConfigError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Sleep between ring buffer polls when nothing is queued
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Running microphone capture with pitch analysis
pub struct LiveCapture {
    config: SessionConfig,
    input: Option<AudioInput>,
    worker: Option<JoinHandle<SessionStats>>,
    running: Arc<AtomicBool>,
}

impl LiveCapture {
    /// Validate the configuration; the device is opened by `start`
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            config,
            input: None,
            worker: None,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Open the default input device and start analysis
    ///
    /// # Arguments
    /// * `sink` - Receives one frequency per analyzed frame with an estimate
    ///
    /// # Returns
    /// Information about the opened device
    pub fn start<S>(&mut self, mut sink: S) -> Result<AudioDeviceInfo, AudioError>
    where
        S: FrequencySink + Send + 'static,
    {
        if self.running.load(Ordering::SeqCst) {
            return Err(AudioError::AlreadyRunning);
        }

        let (producer, mut consumer) = SampleRingBuffer::new(self.config.ring_capacity).split();
        let input = AudioInput::from_default_device(producer)?;
        let device_info = input.device_info().clone();

        // Frame size is fixed; the rate comes from the device
        let config = self.config.with_sample_rate(device_info.sample_rate as f32);
        let mut session = CaptureSession::new(config)?;

        input.start()?;
        self.running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let handle = std::thread::spawn(move || {
            let mut scratch = vec![0.0; config.estimator.frame_size];

            while running.load(Ordering::SeqCst) {
                if session.drain(&mut consumer, &mut scratch, &mut sink) == 0 {
                    std::thread::sleep(POLL_INTERVAL);
                }
            }

            session.stats()
        });

        tracing::info!(device = %device_info.name, "Live capture started");

        self.config = config;
        self.input = Some(input);
        self.worker = Some(handle);

        Ok(device_info)
    }

    /// Stop capture and wait for the analysis thread
    ///
    /// # Returns
    /// Session counters, `None` if capture was not running
    pub fn stop(&mut self) -> Option<SessionStats> {
        self.running.store(false, Ordering::SeqCst);

        if let Some(input) = self.input.take() {
            if let Err(e) = input.pause() {
                tracing::warn!(error = %e, "Failed to pause audio input");
            }
        }

        let stats = match self.worker.take()?.join() {
            Ok(stats) => stats,
            Err(_) => {
                tracing::error!("Analysis thread panicked");
                return None;
            }
        };

        tracing::info!(
            frames = stats.frames_analyzed,
            delivered = stats.estimates_delivered,
            skipped = stats.frames_skipped,
            dropped = stats.samples_dropped,
            overruns = stats.overruns,
            "Live capture stopped"
        );

        Some(stats)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Active configuration (sample rate reflects the device once started)
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl Drop for LiveCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
