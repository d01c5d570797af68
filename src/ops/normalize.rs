//! L2 normalization of fingerprints.
//!
//! Each lane along the last axis is an independent vector. A zero vector is
//! left as it is.

use ndarray::{Array, ArrayBase, ArrayView1, ArrayViewMut1, Axis, Data, DataMut, Dimension, RemoveAxis};

/// Euclidean norm of a fingerprint.
pub fn norm(vector: ArrayView1<'_, f64>) -> f64 {
    vector.dot(&vector).sqrt()
}

/// Normalize one vector in place. Returns `false` for a zero vector, which is
/// not modified.
pub fn normalize_vector(mut vector: ArrayViewMut1<'_, f64>) -> bool {
    let n = norm(vector.view());
    if n == 0.0 {
        return false;
    }
    vector.mapv_inplace(|v| v / n);
    true
}

/// Normalize every lane along the last axis in place.
///
/// Returns how many lanes had zero norm and were left untouched.
pub fn normalize_lanes<S, D>(array: &mut ArrayBase<S, D>) -> usize
where
    S: DataMut<Elem = f64>,
    D: Dimension + RemoveAxis,
{
    let last = Axis(array.ndim() - 1);
    array
        .lanes_mut(last)
        .into_iter()
        .map(normalize_vector)
        .filter(|done| !done)
        .count()
}

/// Normalized copy of `array`.
pub fn normalized<S, D>(array: &ArrayBase<S, D>) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension + RemoveAxis,
{
    let mut out = array.to_owned();
    normalize_lanes(&mut out);
    out
}
