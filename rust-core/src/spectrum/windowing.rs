//! Hann windowing for spectral analysis
//!
//! Tapers a frame to zero at both ends before the FFT to reduce spectral leakage

use std::f32::consts::PI;

/// Generate Hann window coefficients
///
/// w[i] = 0.5 * (1 - cos(2πi/(N-1))) for i = 0..N-1
///
/// A length of 1 divides by zero and produces NaN; callers reject frames
/// shorter than 2 samples before windowing.
pub fn hann_window(length: usize) -> Vec<f32> {
    let denom = length.saturating_sub(1) as f32;

    (0..length)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / denom).cos()))
        .collect()
}

/// Apply a Hann window to a signal
///
/// # Arguments
/// * `samples` - Input frame
///
/// # Returns
/// Windowed copy of the frame, same length as the input
pub fn apply_window(samples: &[f32]) -> Vec<f32> {
    let window = hann_window(samples.len());

    samples
        .iter()
        .zip(window.iter())
        .map(|(&s, &w)| s * w)
        .collect()
}

/// Apply pre-computed window coefficients in-place
///
/// Only the overlapping prefix is touched if the lengths differ.
pub fn apply_window_inplace(samples: &mut [f32], window: &[f32]) {
    for (s, w) in samples.iter_mut().zip(window.iter()) {
        *s *= w;
    }
}
