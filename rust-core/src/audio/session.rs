//! Capture session: frames in, frequencies out
//!
//! The session owns its estimator (and through it the FFT plan and window),
//! so per-buffer callbacks only need a `&mut CaptureSession`.

use crate::audio::adapter::PcmSource;
use crate::audio::buffer::SampleConsumer;
use crate::spectrum::{ConfigError, EstimateError, EstimatorConfig, PitchEstimator, PlanCache};

/// Receiver of frequency estimates (one call per analyzed frame with a result)
pub trait FrequencySink {
    fn deliver(&mut self, frequency: f32);
}

impl<F: FnMut(f32)> FrequencySink for F {
    fn deliver(&mut self, frequency: f32) {
        self(frequency)
    }
}

/// Session configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub estimator: EstimatorConfig,

    /// Ring buffer capacity in samples between device and analysis thread
    pub ring_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let estimator = EstimatorConfig::default();
        Self {
            ring_capacity: estimator.frame_size * 8,
            estimator,
        }
    }
}

impl SessionConfig {
    /// Same frame size, sample rate taken from the opened device
    pub fn with_sample_rate(self, sample_rate: f32) -> Self {
        Self {
            estimator: EstimatorConfig {
                sample_rate,
                ..self.estimator
            },
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.estimator.validate()?;
        if self.ring_capacity == 0 {
            return Err(ConfigError::ZeroRingCapacity);
        }
        Ok(())
    }
}

/// Frame counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_analyzed: u64,
    pub estimates_delivered: u64,
    pub frames_skipped: u64,

    /// Samples lost because the ring buffer was full
    pub samples_dropped: u64,

    /// Gaps in the sample stream; each one discards the frame being assembled
    pub overruns: u64,
}

/// Per-session pitch analysis
pub struct CaptureSession {
    config: SessionConfig,
    estimator: PitchEstimator,
    pending: Vec<f32>,
    stats: SessionStats,
}

impl CaptureSession {
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let estimator = PitchEstimator::new(config.estimator)?;
        Ok(Self::with_estimator(config, estimator))
    }

    /// Build a session whose FFT plan comes from a shared cache
    pub fn with_plan_cache(config: SessionConfig, cache: &PlanCache) -> Result<Self, ConfigError> {
        config.validate()?;
        let estimator = PitchEstimator::with_plan_cache(config.estimator, cache)?;
        Ok(Self::with_estimator(config, estimator))
    }

    fn with_estimator(config: SessionConfig, estimator: PitchEstimator) -> Self {
        tracing::info!(
            frame_size = config.estimator.frame_size,
            sample_rate = config.estimator.sample_rate,
            "Capture session ready"
        );

        Self {
            pending: Vec::with_capacity(config.estimator.frame_size),
            config,
            estimator,
            stats: SessionStats::default(),
        }
    }

    /// Analyze one complete frame and deliver the estimate, if any
    pub fn process_frame<S: FrequencySink + ?Sized>(&mut self, frame: &[f32], sink: &mut S) -> Option<f32> {
        let result = self.estimator.try_estimate(frame);
        self.finish(result, sink)
    }

    /// Analyze channel 0 of a platform buffer
    pub fn process_source<P, S>(&mut self, source: &P, sink: &mut S) -> Option<f32>
    where
        P: PcmSource + ?Sized,
        S: FrequencySink + ?Sized,
    {
        let result = self.estimator.estimate_source(source);
        self.finish(result, sink)
    }

    /// Accumulate an arbitrary-size chunk and analyze every completed frame
    ///
    /// # Returns
    /// Number of frames analyzed from this chunk
    pub fn push_samples<S: FrequencySink + ?Sized>(&mut self, mut chunk: &[f32], sink: &mut S) -> usize {
        let frame_size = self.config.estimator.frame_size;
        let mut frames = 0;

        while !chunk.is_empty() {
            let take = (frame_size - self.pending.len()).min(chunk.len());
            self.pending.extend_from_slice(&chunk[..take]);
            chunk = &chunk[take..];

            if self.pending.len() == frame_size {
                let result = self.estimator.try_estimate(&self.pending);
                self.pending.clear();
                self.finish(result, sink);
                frames += 1;
            }
        }

        frames
    }

    /// Move everything queued in the ring buffer through `push_samples`
    ///
    /// When the producer dropped samples, the stream is no longer continuous:
    /// the partial frame, the chunk just read and whatever is still queued are
    /// discarded so no frame spans the gap.
    ///
    /// # Arguments
    /// * `consumer` - Reading end of the ring buffer
    /// * `scratch` - Chunk buffer reused between calls
    /// * `sink` - Receives one frequency per analyzed frame with an estimate
    ///
    /// # Returns
    /// Number of samples read from the ring
    pub fn drain<S: FrequencySink + ?Sized>(
        &mut self,
        consumer: &mut SampleConsumer,
        scratch: &mut [f32],
        sink: &mut S,
    ) -> usize {
        let mut total = 0;

        loop {
            let n = consumer.read(scratch);
            if n == 0 {
                return total;
            }
            total += n;

            // Checked after the read: a sample written after a drop is only
            // visible once the drop itself is
            let dropped = consumer.take_dropped();
            if dropped > 0 {
                let queued = consumer.discard_queued();
                total += queued;

                let discarded = self.pending.len() + n + queued;
                self.pending.clear();
                self.stats.samples_dropped += dropped;
                self.stats.overruns += 1;
                tracing::warn!(dropped, discarded, "Sample queue overrun, discarding partial frame");
                continue;
            }

            self.push_samples(&scratch[..n], sink);
        }
    }

    fn finish<S: FrequencySink + ?Sized>(&mut self, result: Result<f32, EstimateError>, sink: &mut S) -> Option<f32> {
        self.stats.frames_analyzed += 1;

        match result {
            Ok(frequency) => {
                self.stats.estimates_delivered += 1;
                sink.deliver(frequency);
                Some(frequency)
            }
            Err(e) => {
                // Skip this buffer and wait for the next one
                self.stats.frames_skipped += 1;
                tracing::debug!(error = %e, "No estimate for frame");
                None
            }
        }
    }

    /// Drop any partially accumulated frame
    pub fn reset(&mut self) {
        self.pending.clear();
    }

    /// Samples waiting for the next full frame
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn estimator(&self) -> &PitchEstimator {
        &self.estimator
    }
}
