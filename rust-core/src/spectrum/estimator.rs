//! Dominant-frequency estimator
//!
//! Hann window → real FFT → squared magnitudes → loudest bin above DC → Hz

use super::error::{ConfigError, EstimateError};
use super::fft::{is_power_of_two_length, FftEngine, PlanCache};
use super::windowing::{apply_window_inplace, hann_window};
use crate::audio::adapter::PcmSource;

/// Estimator configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorConfig {
    /// Frame length N (must be a power of two, at least 2)
    pub frame_size: usize,

    /// Sample rate in Hz
    pub sample_rate: f32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            sample_rate: 44100.0,
        }
    }
}

impl EstimatorConfig {
    pub fn new(frame_size: usize, sample_rate: f32) -> Self {
        Self {
            frame_size,
            sample_rate,
        }
    }

    /// Reject configurations the estimator cannot analyze correctly
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_size < 2 {
            return Err(ConfigError::FrameSizeTooSmall(self.frame_size));
        }
        if !self.frame_size.is_power_of_two() {
            return Err(ConfigError::NonPowerOfTwoFrameSize(self.frame_size));
        }
        if !valid_sample_rate(self.sample_rate) {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        Ok(())
    }

    /// Width of one frequency bin in Hz
    pub fn bin_width(&self) -> f32 {
        self.sample_rate / self.frame_size as f32
    }
}

fn valid_sample_rate(rate: f32) -> bool {
    rate.is_finite() && rate > 0.0
}

/// Winning bin of a spectrum search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakBin {
    pub index: usize,
    pub magnitude: f32,
}

/// Find the loudest bin, skipping bin 0 (DC)
///
/// Strict comparison keeps the first index on ties. Returns `None` when
/// there is no bin above DC.
pub fn select_peak_bin(magnitudes: &[f32]) -> Option<PeakBin> {
    let first = *magnitudes.get(1)?;
    let mut peak = PeakBin {
        index: 1,
        magnitude: first,
    };

    for (index, &magnitude) in magnitudes.iter().enumerate().skip(2) {
        if magnitude > peak.magnitude {
            peak = PeakBin { index, magnitude };
        }
    }

    Some(peak)
}

/// Convert a bin index to Hz: k * sample_rate / frame_len
pub fn bin_to_frequency(bin: usize, sample_rate: f32, frame_len: usize) -> f32 {
    bin as f32 * sample_rate / frame_len as f32
}

/// Estimate the dominant frequency of an already windowed frame
///
/// Plans the transform on every call. Sessions that analyze many frames
/// should hold a `PitchEstimator` instead.
pub fn estimate_frequency(windowed: &[f32], sample_rate: f32) -> Option<f32> {
    try_estimate_frequency(windowed, sample_rate).ok()
}

/// Fallible form of `estimate_frequency`
pub fn try_estimate_frequency(windowed: &[f32], sample_rate: f32) -> Result<f32, EstimateError> {
    let n = windowed.len();

    if n < 2 {
        return Err(EstimateError::DegenerateFrame { len: n });
    }
    if !is_power_of_two_length(n) {
        return Err(EstimateError::NonPowerOfTwoLength { len: n });
    }
    if !valid_sample_rate(sample_rate) {
        return Err(EstimateError::InvalidSampleRate { rate: sample_rate });
    }
    check_finite(windowed)?;

    let mut engine = FftEngine::new(n);
    let peak = checked_peak(engine.power_spectrum(windowed)?, n)?;

    Ok(bin_to_frequency(peak.index, sample_rate, n))
}

fn check_finite(samples: &[f32]) -> Result<(), EstimateError> {
    match samples.iter().position(|s| !s.is_finite()) {
        Some(index) => Err(EstimateError::NonFiniteInput { index }),
        None => Ok(()),
    }
}

/// Squared magnitudes of very loud but finite input may overflow to +inf.
/// That still orders above every finite bin, so only NaN is rejected.
fn checked_peak(magnitudes: &[f32], n: usize) -> Result<PeakBin, EstimateError> {
    let peak = select_peak_bin(magnitudes).ok_or(EstimateError::DegenerateFrame { len: n })?;

    if peak.magnitude.is_nan() {
        return Err(EstimateError::NonFiniteSpectrum);
    }

    Ok(peak)
}

/// Pitch estimator for one frame length and sample rate
///
/// Holds the FFT plan, the window coefficients and all working buffers, so
/// the per-frame path does not allocate.
pub struct PitchEstimator {
    config: EstimatorConfig,
    engine: FftEngine,
    window: Vec<f32>,
    frame: Vec<f32>,
    last_peak: Option<PeakBin>,
}

impl PitchEstimator {
    /// Create an estimator with its own FFT plan
    pub fn new(config: EstimatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, FftEngine::new(config.frame_size)))
    }

    /// Create an estimator that borrows its plan from a shared cache
    pub fn with_plan_cache(config: EstimatorConfig, cache: &PlanCache) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, FftEngine::with_plan(cache.get(config.frame_size))))
    }

    fn build(config: EstimatorConfig, engine: FftEngine) -> Self {
        Self {
            window: hann_window(config.frame_size),
            frame: vec![0.0; config.frame_size],
            engine,
            config,
            last_peak: None,
        }
    }

    /// Estimate the dominant frequency of a raw frame, `None` if unusable
    pub fn estimate(&mut self, samples: &[f32]) -> Option<f32> {
        self.try_estimate(samples).ok()
    }

    /// Window and analyze a raw frame
    pub fn try_estimate(&mut self, samples: &[f32]) -> Result<f32, EstimateError> {
        self.check_length(samples.len())?;
        check_finite(samples)?;

        self.frame.copy_from_slice(samples);
        apply_window_inplace(&mut self.frame, &self.window);

        self.analyze_frame()
    }

    /// Estimate from a frame the caller has already windowed
    pub fn estimate_windowed(&mut self, windowed: &[f32]) -> Option<f32> {
        self.try_estimate_windowed(windowed).ok()
    }

    pub fn try_estimate_windowed(&mut self, windowed: &[f32]) -> Result<f32, EstimateError> {
        self.check_length(windowed.len())?;
        check_finite(windowed)?;
        self.frame.copy_from_slice(windowed);
        self.analyze_frame()
    }

    /// Analyze channel 0 of a platform buffer
    pub fn estimate_source<S: PcmSource + ?Sized>(&mut self, source: &S) -> Result<f32, EstimateError> {
        let rate = source.sample_rate();
        if rate != self.config.sample_rate {
            return Err(EstimateError::SampleRateMismatch {
                expected: self.config.sample_rate,
                actual: rate,
            });
        }

        let channel = source.channel(0).ok_or(EstimateError::InputUnavailable)?;
        self.try_estimate(&channel)
    }

    fn check_length(&self, len: usize) -> Result<(), EstimateError> {
        if len < 2 {
            return Err(EstimateError::DegenerateFrame { len });
        }
        if len != self.config.frame_size {
            return Err(EstimateError::LengthMismatch {
                expected: self.config.frame_size,
                actual: len,
            });
        }
        Ok(())
    }

    fn analyze_frame(&mut self) -> Result<f32, EstimateError> {
        self.last_peak = None;

        let n = self.config.frame_size;
        let peak = checked_peak(self.engine.power_spectrum(&self.frame)?, n)?;

        self.last_peak = Some(peak);
        Ok(bin_to_frequency(peak.index, self.config.sample_rate, n))
    }

    /// Squared magnitudes (N/2 bins) of the most recent analysis
    pub fn last_spectrum(&self) -> &[f32] {
        self.engine.magnitudes()
    }

    /// Winning bin of the most recent successful analysis
    pub fn last_peak(&self) -> Option<PeakBin> {
        self.last_peak
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn frame_size(&self) -> usize {
        self.config.frame_size
    }

    pub fn sample_rate(&self) -> f32 {
        self.config.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::windowing::apply_window;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    fn sine(freq: f32, sample_rate: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_config_validation() {
        assert!(EstimatorConfig::default().validate().is_ok());

        assert_eq!(
            EstimatorConfig::new(1000, 44100.0).validate(),
            Err(ConfigError::NonPowerOfTwoFrameSize(1000))
        );
        assert_eq!(
            EstimatorConfig::new(1, 44100.0).validate(),
            Err(ConfigError::FrameSizeTooSmall(1))
        );
        assert_eq!(
            EstimatorConfig::new(0, 44100.0).validate(),
            Err(ConfigError::FrameSizeTooSmall(0))
        );
        assert!(matches!(
            EstimatorConfig::new(2048, 0.0).validate(),
            Err(ConfigError::InvalidSampleRate(_))
        ));
        assert!(matches!(
            EstimatorConfig::new(2048, f32::NAN).validate(),
            Err(ConfigError::InvalidSampleRate(_))
        ));
    }

    #[test]
    fn test_bin_width() {
        let config = EstimatorConfig::default();
        assert_relative_eq!(config.bin_width(), 44100.0 / 2048.0);
    }

    #[test]
    fn test_select_peak_skips_dc() {
        let peak = select_peak_bin(&[100.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(peak.index, 2);
        assert_eq!(peak.magnitude, 3.0);
    }

    #[test]
    fn test_select_peak_first_maximum_wins() {
        let peak = select_peak_bin(&[0.0, 1.0, 5.0, 3.0, 5.0, 2.0]).unwrap();
        assert_eq!(peak.index, 2);
    }

    #[test]
    fn test_select_peak_flat_spectrum() {
        // Nothing beats bin 1 on a silent frame
        let peak = select_peak_bin(&[0.0; 16]).unwrap();
        assert_eq!(peak.index, 1);
    }

    #[test]
    fn test_select_peak_no_bins() {
        assert!(select_peak_bin(&[]).is_none());
        assert!(select_peak_bin(&[42.0]).is_none());
    }

    #[test]
    fn test_bin_to_frequency() {
        assert_relative_eq!(bin_to_frequency(20, 44100.0, 2048), 430.664_06, epsilon = 1e-3);
        assert_eq!(bin_to_frequency(0, 48000.0, 1024), 0.0);
    }

    #[test]
    fn test_known_tone() {
        let windowed = apply_window(&sine(440.0, 44100.0, 2048));
        let freq = estimate_frequency(&windowed, 44100.0).unwrap();

        // Bin 20 has the centre nearest 440 Hz
        assert_relative_eq!(freq, bin_to_frequency(20, 44100.0, 2048));
        assert!((freq - 440.0).abs() < 44100.0 / 2048.0);
    }

    #[test]
    fn test_stateless_degenerate_inputs() {
        assert_eq!(
            try_estimate_frequency(&[], 44100.0),
            Err(EstimateError::DegenerateFrame { len: 0 })
        );
        assert_eq!(
            try_estimate_frequency(&[1.0], 44100.0),
            Err(EstimateError::DegenerateFrame { len: 1 })
        );
        // Two samples give a single (DC) bin
        assert_eq!(
            try_estimate_frequency(&[1.0, -1.0], 44100.0),
            Err(EstimateError::DegenerateFrame { len: 2 })
        );
        assert_eq!(
            try_estimate_frequency(&vec![0.0; 1000], 44100.0),
            Err(EstimateError::NonPowerOfTwoLength { len: 1000 })
        );
        assert!(matches!(
            try_estimate_frequency(&vec![0.0; 1024], -1.0),
            Err(EstimateError::InvalidSampleRate { .. })
        ));
    }

    #[test]
    fn test_estimator_matches_stateless_path() {
        let signal = sine(1000.0, 48000.0, 1024);
        let mut estimator = PitchEstimator::new(EstimatorConfig::new(1024, 48000.0)).unwrap();

        let cached = estimator.estimate(&signal).unwrap();
        let stateless = estimate_frequency(&apply_window(&signal), 48000.0).unwrap();

        assert_eq!(cached, stateless);
        assert_eq!(estimator.last_peak().unwrap().index, 21);
        assert_eq!(estimator.last_spectrum().len(), 512);
    }

    #[test]
    fn test_estimator_rejects_wrong_length() {
        let mut estimator = PitchEstimator::new(EstimatorConfig::default()).unwrap();

        assert_eq!(
            estimator.try_estimate(&[0.0; 1024]),
            Err(EstimateError::LengthMismatch {
                expected: 2048,
                actual: 1024
            })
        );
        assert_eq!(
            estimator.try_estimate(&[]),
            Err(EstimateError::DegenerateFrame { len: 0 })
        );
        assert!(estimator.last_peak().is_none());
    }

    #[test]
    fn test_estimator_non_finite_input() {
        let mut estimator = PitchEstimator::new(EstimatorConfig::new(64, 8000.0)).unwrap();
        let mut signal = vec![0.0; 64];
        signal[10] = f32::NAN;

        assert_eq!(
            estimator.try_estimate(&signal),
            Err(EstimateError::NonFiniteInput { index: 10 })
        );

        signal[10] = f32::INFINITY;
        assert_eq!(
            estimator.try_estimate(&signal),
            Err(EstimateError::NonFiniteInput { index: 10 })
        );
        assert_eq!(
            try_estimate_frequency(&signal, 8000.0),
            Err(EstimateError::NonFiniteInput { index: 10 })
        );
        assert!(estimator.last_peak().is_none());
    }

    #[test]
    fn test_huge_finite_input_still_estimates() {
        let mut estimator = PitchEstimator::new(EstimatorConfig::new(256, 8000.0)).unwrap();
        let mut signal = vec![0.0; 256];
        signal[100] = 1e30;

        // Every bin overflows to +inf; the first one wins
        assert_eq!(estimator.try_estimate(&signal), Ok(31.25));
        assert_eq!(estimator.last_peak().map(|p| p.index), Some(1));
        assert_eq!(try_estimate_frequency(&signal, 8000.0), Ok(31.25));
    }

    #[test]
    fn test_estimator_windowed_input() {
        let windowed = apply_window(&sine(440.0, 44100.0, 2048));
        let mut estimator = PitchEstimator::new(EstimatorConfig::default()).unwrap();

        assert_eq!(
            estimator.estimate_windowed(&windowed),
            estimate_frequency(&windowed, 44100.0)
        );
    }

    #[test]
    fn test_estimator_shares_plan_cache() {
        let cache = PlanCache::new();
        let config = EstimatorConfig::new(512, 16000.0);

        let mut a = PitchEstimator::with_plan_cache(config, &cache).unwrap();
        let mut b = PitchEstimator::with_plan_cache(config, &cache).unwrap();
        assert_eq!(cache.len(), 1);

        let signal = sine(500.0, 16000.0, 512);
        assert_eq!(a.estimate(&signal), b.estimate(&signal));
        assert_eq!(a.estimate(&signal), Some(500.0));
    }

    #[test]
    fn test_plan_cache_rejects_bad_config() {
        let cache = PlanCache::new();
        let result = PitchEstimator::with_plan_cache(EstimatorConfig::new(300, 16000.0), &cache);

        assert!(result.is_err());
        assert!(cache.is_empty());
    }
}
