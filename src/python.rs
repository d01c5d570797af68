//! Python bindings for the core operations, on numpy arrays.

use ndarray::Array2;
use numpy::{IntoPyArray, PyArray2, PyArray3, PyReadonlyArray2, PyReadonlyArray3};
use pyo3::prelude::*;

use crate::config::ClassifierConfig;
use crate::ops::classify::classify;
use crate::ops::distance::DistanceKind;
use crate::ops::kinetics::{calculate_residence_times, calculate_transition_matrix};
use crate::ops::reconstruct::expand_lanes;
use crate::ops::tracker::track_states;
use crate::types::catalog::ReferenceCatalog;
use crate::types::classification::Classification;
use crate::types::fingerprint::SoapParams;

fn value_error(e: impl std::fmt::Display) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string())
}

fn states_from_numpy(
    references: PyReadonlyArray2<'_, i64>,
    n_states: usize,
) -> PyResult<Classification> {
    let view = references.as_array();
    let mut states = Array2::<usize>::zeros(view.dim());
    for (dst, &src) in states.iter_mut().zip(view.iter()) {
        *dst = usize::try_from(src).map_err(|_| value_error(format!("negative state id {src}")))?;
    }
    let legend = (0..n_states).map(|i| format!("state{i}")).collect();
    Classification::from_states(states, legend).map_err(value_error)
}

/// Expand compressed single-species fingerprints stored as rows.
#[pyfunction]
pub fn expand_fingerprints<'py>(
    py: Python<'py>,
    fingerprints: PyReadonlyArray2<'py, f64>,
    l_max: usize,
    n_max: usize,
) -> PyResult<Bound<'py, PyArray2<f64>>> {
    let full = expand_lanes(&fingerprints.as_array(), SoapParams::new(l_max, n_max), None)
        .map_err(value_error)?;
    Ok(full.into_pyarray(py))
}

/// Classify a `(frames, atoms, len)` array against named references.
///
/// Returns `(distances, references, legend)`.
#[pyfunction]
#[pyo3(signature = (data, names, spectra, l_max, n_max, chunk_size=100, normalize=false, kernel_power=1))]
#[allow(clippy::too_many_arguments)]
pub fn classify_fingerprints<'py>(
    py: Python<'py>,
    data: PyReadonlyArray3<'py, f64>,
    names: Vec<String>,
    spectra: PyReadonlyArray2<'py, f64>,
    l_max: usize,
    n_max: usize,
    chunk_size: usize,
    normalize: bool,
    kernel_power: u32,
) -> PyResult<(Bound<'py, PyArray2<f64>>, Bound<'py, PyArray2<i64>>, Vec<String>)> {
    let catalog = ReferenceCatalog::new(
        names,
        spectra.as_array().to_owned(),
        SoapParams::new(l_max, n_max),
    )
    .map_err(value_error)?;
    let distance = match kernel_power {
        0 => return Err(value_error("kernel_power must be at least 1")),
        1 => DistanceKind::Simple,
        power => DistanceKind::Kernel { power },
    };
    let config = ClassifierConfig::default()
        .with_chunk_size(chunk_size)
        .with_normalize(normalize)
        .with_distance(distance);

    let mut source = data.as_array();
    let result = py
        .detach(|| classify(&mut source, &catalog, &config))
        .map_err(value_error)?;
    let (distances, references, legend) = result.into_parts();
    Ok((
        distances.into_pyarray(py),
        references.mapv(|r| r as i64).into_pyarray(py),
        legend,
    ))
}

/// Per-atom events as `(previous, current, next, duration)` tuples.
#[pyfunction]
pub fn track_states_py(
    references: PyReadonlyArray2<'_, i64>,
    n_states: usize,
) -> PyResult<Vec<Vec<(usize, usize, usize, usize)>>> {
    let classification = states_from_numpy(references, n_states)?;
    Ok(track_states(&classification)
        .into_iter()
        .map(|events| {
            events
                .into_iter()
                .map(|e| (e.previous, e.current, e.next, e.duration))
                .collect()
        })
        .collect())
}

#[pyfunction]
#[pyo3(signature = (references, n_states, stride=1))]
pub fn transition_matrix_py<'py>(
    py: Python<'py>,
    references: PyReadonlyArray2<'py, i64>,
    n_states: usize,
    stride: usize,
) -> PyResult<Bound<'py, PyArray2<f64>>> {
    let classification = states_from_numpy(references, n_states)?;
    let matrix = calculate_transition_matrix(&classification, stride, None).map_err(value_error)?;
    Ok(matrix.into_pyarray(py))
}

#[pyfunction]
pub fn residence_times_py(
    references: PyReadonlyArray2<'_, i64>,
    n_states: usize,
) -> PyResult<Vec<Vec<i64>>> {
    let classification = states_from_numpy(references, n_states)?;
    calculate_residence_times(&classification, None).map_err(value_error)
}

/// Full `(frames, atoms, references)` distance tensor.
#[pyfunction]
#[pyo3(signature = (data, names, spectra, l_max, n_max, chunk_size=100))]
pub fn distances_from_references_py<'py>(
    py: Python<'py>,
    data: PyReadonlyArray3<'py, f64>,
    names: Vec<String>,
    spectra: PyReadonlyArray2<'py, f64>,
    l_max: usize,
    n_max: usize,
    chunk_size: usize,
) -> PyResult<Bound<'py, PyArray3<f64>>> {
    let catalog = ReferenceCatalog::new(
        names,
        spectra.as_array().to_owned(),
        SoapParams::new(l_max, n_max),
    )
    .map_err(value_error)?;
    let config = ClassifierConfig::default().with_chunk_size(chunk_size);
    let mut source = data.as_array();
    let tensor = crate::ops::classify::distances_from_references(&mut source, &catalog, &config)
        .map_err(value_error)?;
    Ok(tensor.into_pyarray(py))
}
