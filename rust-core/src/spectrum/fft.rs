//! FFT engine using realfft for real-valued frames
//!
//! Produces the squared-magnitude spectrum used for peak picking. Plans are
//! created once per frame length and can be shared through a `PlanCache`.

use super::error::EstimateError;
use num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Binary order of a frame length: round(log2(n))
///
/// Only exact for power-of-two lengths; see `is_power_of_two_length`.
pub fn fft_order(n: usize) -> u32 {
    (n as f32).log2().round() as u32
}

/// True when `n` is an exact power of two (1 excluded, it has no bins to search)
pub fn is_power_of_two_length(n: usize) -> bool {
    n >= 2 && n.is_power_of_two()
}

/// Thread-safe cache of forward plans keyed by frame length
///
/// One planner lives behind the mutex so realfft can reuse the twiddles and
/// inner plans it already built for other lengths.
pub struct PlanCache {
    state: Mutex<PlannerState>,
}

struct PlannerState {
    planner: RealFftPlanner<f32>,
    plans: HashMap<usize, Arc<dyn RealToComplex<f32>>>,
}

impl Default for PlanCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanCache {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PlannerState {
                planner: RealFftPlanner::new(),
                plans: HashMap::new(),
            }),
        }
    }

    /// Get the forward plan for `fft_size`, planning it on first use
    pub fn get(&self, fft_size: usize) -> Arc<dyn RealToComplex<f32>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let PlannerState { planner, plans } = &mut *state;

        let plan = plans.entry(fft_size).or_insert_with(|| {
            tracing::debug!(fft_size, order = fft_order(fft_size), "Planning forward FFT");
            planner.plan_fft_forward(fft_size)
        });

        Arc::clone(plan)
    }

    /// Number of cached plans
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .plans
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// FFT engine for one frame length
pub struct FftEngine {
    /// FFT size (number of samples)
    fft_size: usize,

    /// Real FFT processor
    r2c: Arc<dyn RealToComplex<f32>>,

    /// Reusable input buffer (realfft overwrites it during processing)
    input_buffer: Vec<f32>,

    /// Reusable output buffer (fft_size/2 + 1 complex bins)
    output_buffer: Vec<Complex<f32>>,

    /// Scratch space so processing never allocates
    scratch: Vec<Complex<f32>>,

    /// Squared magnitudes of bins 0..fft_size/2
    magnitudes: Vec<f32>,
}

impl FftEngine {
    /// Create new FFT engine with its own plan
    ///
    /// # Arguments
    /// * `fft_size` - FFT size (number of samples)
    pub fn new(fft_size: usize) -> Self {
        tracing::debug!(fft_size, order = fft_order(fft_size), "Planning forward FFT");
        let mut planner = RealFftPlanner::<f32>::new();
        Self::with_plan(planner.plan_fft_forward(fft_size))
    }

    /// Create FFT engine from an existing (possibly shared) plan
    pub fn with_plan(r2c: Arc<dyn RealToComplex<f32>>) -> Self {
        let fft_size = r2c.len();

        Self {
            fft_size,
            input_buffer: r2c.make_input_vec(),
            output_buffer: r2c.make_output_vec(),
            scratch: r2c.make_scratch_vec(),
            magnitudes: vec![0.0; fft_size / 2],
            r2c,
        }
    }

    /// Compute the power spectrum (squared magnitude) of a windowed frame
    ///
    /// # Arguments
    /// * `windowed` - Exactly `fft_size` windowed samples
    ///
    /// # Returns
    /// re² + im² for bins 0..fft_size/2. The Nyquist bin is not included.
    pub fn power_spectrum(&mut self, windowed: &[f32]) -> Result<&[f32], EstimateError> {
        if windowed.len() != self.fft_size {
            return Err(EstimateError::LengthMismatch {
                expected: self.fft_size,
                actual: windowed.len(),
            });
        }

        self.input_buffer.copy_from_slice(windowed);

        self.r2c
            .process_with_scratch(
                &mut self.input_buffer,
                &mut self.output_buffer,
                &mut self.scratch,
            )
            .map_err(|e| EstimateError::Transform(e.to_string()))?;

        for (mag, c) in self.magnitudes.iter_mut().zip(self.output_buffer.iter()) {
            *mag = c.re * c.re + c.im * c.im;
        }

        Ok(&self.magnitudes)
    }

    /// Squared magnitudes from the most recent `power_spectrum` call
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_fft_order() {
        assert_eq!(fft_order(2), 1);
        assert_eq!(fft_order(1024), 10);
        assert_eq!(fft_order(2048), 11);
        // Non-power-of-two lengths round to the nearest order
        assert_eq!(fft_order(1000), 10);
        assert_eq!(fft_order(1500), 11);
    }

    #[test]
    fn test_power_of_two_check() {
        assert!(is_power_of_two_length(2));
        assert!(is_power_of_two_length(4096));
        assert!(!is_power_of_two_length(0));
        assert!(!is_power_of_two_length(1));
        assert!(!is_power_of_two_length(1000));
    }

    #[test]
    fn test_power_spectrum_length() {
        let mut fft = FftEngine::new(1024);
        let spectrum = fft.power_spectrum(&vec![0.0; 1024]).unwrap();

        assert_eq!(spectrum.len(), 512);
        assert!(spectrum.iter().all(|&m| m == 0.0));
    }

    #[test]
    fn test_dc_signal() {
        let mut fft = FftEngine::new(256);
        let spectrum = fft.power_spectrum(&vec![1.0; 256]).unwrap();

        // All energy in bin 0: |256|^2
        assert!((spectrum[0] - 65536.0).abs() < 1.0);
        assert!(spectrum[1..].iter().all(|&m| m < 1e-3));
    }

    #[test]
    fn test_sine_peak() {
        let mut fft = FftEngine::new(1024);

        // Exactly on bin 64
        let signal: Vec<f32> = (0..1024)
            .map(|n| (2.0 * PI * 64.0 * n as f32 / 1024.0).sin())
            .collect();

        let spectrum = fft.power_spectrum(&signal).unwrap();
        let (peak_bin, &peak) = spectrum
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .unwrap();

        assert_eq!(peak_bin, 64);
        // |N/2|^2 for a unit sine
        assert!((peak - 512.0 * 512.0).abs() / (512.0 * 512.0) < 1e-3);
    }

    #[test]
    fn test_length_mismatch() {
        let mut fft = FftEngine::new(64);
        let err = fft.power_spectrum(&[0.0; 32]).unwrap_err();

        assert_eq!(
            err,
            EstimateError::LengthMismatch {
                expected: 64,
                actual: 32
            }
        );
    }

    #[test]
    fn test_plan_cache_reuses_plans() {
        let cache = PlanCache::new();
        assert!(cache.is_empty());

        let a = cache.get(2048);
        let b = cache.get(2048);
        let c = cache.get(512);

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(c.len(), 512);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_plan_cache_concurrent_access() {
        let cache = Arc::new(PlanCache::new());

        let handles: Vec<_> = [256, 512, 1024, 256, 512, 1024]
            .into_iter()
            .map(|n| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.get(n).len())
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap() >= 256);
        }
        assert_eq!(cache.len(), 3);
    }
}
