//! PyO3 bindings for Python integration
//!
//! Adapts numpy arrays to the estimator's sample contract.

use pyo3::prelude::*;

mod estimator_bindings;

/// Python module definition
#[pymodule]
fn tuner_pitch(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<estimator_bindings::PyPitchEstimator>()?;
    m.add_function(wrap_pyfunction!(estimator_bindings::apply_window, m)?)?;
    m.add_function(wrap_pyfunction!(estimator_bindings::estimate_frequency, m)?)?;

    Ok(())
}
