//! Tuner Pitch Core - dominant-frequency estimation for a microphone tuner
//!
//! Windows each captured frame, transforms it with a real FFT and reports the
//! loudest bin above DC as a frequency in Hz. Platform capture code adapts its
//! buffers through `audio::adapter` and drives a `CaptureSession`.

// Suppress PyO3 non-local impl warnings (harmless macro-generated code)
#![allow(non_local_definitions)]

pub mod audio;
pub mod spectrum;

#[cfg(feature = "python")]
pub mod python_bindings;

pub use audio::{CaptureSession, FrequencySink, SessionConfig};
pub use spectrum::{estimate_frequency, EstimatorConfig, PitchEstimator};
