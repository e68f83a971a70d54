//! Python bindings for pitch estimation

use crate::audio::adapter::PcmI16;
use crate::spectrum::{self, EstimatorConfig, PitchEstimator};
use numpy::{PyArray1, PyReadonlyArray1};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

fn contiguous<'a, T: numpy::Element>(array: &'a PyReadonlyArray1<'_, T>) -> PyResult<&'a [T]> {
    array
        .as_slice()
        .map_err(|e| PyValueError::new_err(format!("Array must be contiguous: {}", e)))
}

/// Pitch estimator exposed to Python
#[pyclass(name = "PitchEstimator")]
pub struct PyPitchEstimator {
    estimator: PitchEstimator,
}

#[pymethods]
impl PyPitchEstimator {
    /// Create a new estimator
    ///
    /// Args:
    ///     frame_size: Samples per frame (power of two)
    ///     sample_rate: Sample rate in Hz
    ///
    /// Raises:
    ///     ValueError: if the configuration cannot be analyzed
    #[new]
    #[pyo3(signature = (frame_size=2048, sample_rate=44100.0))]
    fn new(frame_size: usize, sample_rate: f32) -> PyResult<Self> {
        let estimator = PitchEstimator::new(EstimatorConfig::new(frame_size, sample_rate))
            .map_err(|e| PyValueError::new_err(e.to_string()))?;

        Ok(Self { estimator })
    }

    /// Estimate the dominant frequency of a float32 frame
    ///
    /// Returns:
    ///     Frequency in Hz, or None if the frame could not be analyzed
    fn estimate(&mut self, samples: PyReadonlyArray1<f32>) -> PyResult<Option<f32>> {
        let samples = contiguous(&samples)?;
        Ok(self.estimator.estimate(samples))
    }

    /// Estimate from a mono int16 PCM frame
    fn estimate_pcm16(&mut self, samples: PyReadonlyArray1<i16>) -> PyResult<Option<f32>> {
        let samples = contiguous(&samples)?;
        let source = PcmI16::new(samples, self.estimator.sample_rate());
        Ok(self.estimator.estimate_source(&source).ok())
    }

    /// Squared magnitudes (frame_size/2 bins) of the last analyzed frame
    fn spectrum<'py>(&self, py: Python<'py>) -> &'py PyArray1<f32> {
        PyArray1::from_slice(py, self.estimator.last_spectrum())
    }

    #[getter]
    fn frame_size(&self) -> usize {
        self.estimator.frame_size()
    }

    #[getter]
    fn sample_rate(&self) -> f32 {
        self.estimator.sample_rate()
    }
}

/// Apply a Hann window to a float32 frame
#[pyfunction]
pub fn apply_window<'py>(py: Python<'py>, samples: PyReadonlyArray1<f32>) -> PyResult<&'py PyArray1<f32>> {
    let samples = contiguous(&samples)?;
    Ok(PyArray1::from_vec(py, spectrum::apply_window(samples)))
}

/// Estimate the dominant frequency of an already windowed frame
#[pyfunction]
pub fn estimate_frequency(windowed: PyReadonlyArray1<f32>, sample_rate: f32) -> PyResult<Option<f32>> {
    let windowed = contiguous(&windowed)?;
    Ok(spectrum::estimate_frequency(windowed, sample_rate))
}
