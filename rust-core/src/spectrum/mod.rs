//! Spectral pitch estimation

pub mod error;
pub mod estimator;
pub mod fft;
pub mod windowing;

pub use error::{ConfigError, EstimateError};
pub use estimator::{
    bin_to_frequency, estimate_frequency, select_peak_bin, try_estimate_frequency,
    EstimatorConfig, PeakBin, PitchEstimator,
};
pub use fft::{FftEngine, PlanCache};
pub use windowing::apply_window;
