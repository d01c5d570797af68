pub mod adapters;
pub mod config;
pub mod ops;
pub mod thread_pool;
pub mod types;

#[cfg(feature = "python")]
pub mod python;

pub use config::ClassifierConfig;

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule(name = "soapify")]
fn soapify(_py: Python, m: &Bound<PyModule>) -> PyResult<()> {
    // Fingerprint layout
    m.add_function(wrap_pyfunction!(python::expand_fingerprints, m)?)?;

    // Classification
    m.add_function(wrap_pyfunction!(python::classify_fingerprints, m)?)?;
    m.add_function(wrap_pyfunction!(python::distances_from_references_py, m)?)?;

    // Kinetics
    m.add_function(wrap_pyfunction!(python::track_states_py, m)?)?;
    m.add_function(wrap_pyfunction!(python::transition_matrix_py, m)?)?;
    m.add_function(wrap_pyfunction!(python::residence_times_py, m)?)?;

    Ok(())
}
