//! Expansion of symmetry-compressed fingerprints into their full form.
//!
//! Compressed same-species blocks store, for each angular index `l`, the
//! upper triangle `n <= n'` of the radial block in row-major order. The full
//! block is rebuilt with `full[l, n, n'] = full[l, n', n] = stored`.
//! Cross-species blocks are already full and are copied through.

use ndarray::{s, Array, Array1, ArrayBase, ArrayView1, ArrayViewMut1, Axis, Data, Dimension, RemoveAxis};

use crate::types::fingerprint::{FingerprintError, Layout, SoapParams, SpeciesBlocks};

/// Expand one fingerprint to its full layout.
///
/// `blocks == None` means a single-species fingerprint. A vector that already
/// has the full length is returned as an owned copy.
pub fn expand_vector(
    vector: ArrayView1<'_, f64>,
    params: SoapParams,
    blocks: Option<&SpeciesBlocks>,
) -> Result<Array1<f64>, FingerprintError> {
    let layout = Layout::detect(vector.len(), params, blocks)?;
    let mut out = Array1::zeros(layout.full_len());
    expand_into(vector, out.view_mut(), &layout, blocks);
    Ok(out)
}

/// Expand every fingerprint stored along the last axis of `array`.
///
/// Works for a 2-D batch `(n, len)` as well as a 3-D chunk
/// `(frames, atoms, len)`; each lane is transformed independently.
pub fn expand_lanes<S, D>(
    array: &ArrayBase<S, D>,
    params: SoapParams,
    blocks: Option<&SpeciesBlocks>,
) -> Result<Array<f64, D>, FingerprintError>
where
    S: Data<Elem = f64>,
    D: Dimension + RemoveAxis,
{
    let last = array.ndim() - 1;
    let layout = Layout::detect(array.len_of(Axis(last)), params, blocks)?;

    let mut dim = array.raw_dim();
    dim[last] = layout.full_len();
    let mut out = Array::zeros(dim);

    for (src, dst) in array
        .lanes(Axis(last))
        .into_iter()
        .zip(out.lanes_mut(Axis(last)))
    {
        expand_into(src, dst, &layout, blocks);
    }
    Ok(out)
}

fn expand_into(
    src: ArrayView1<'_, f64>,
    mut dst: ArrayViewMut1<'_, f64>,
    layout: &Layout,
    blocks: Option<&SpeciesBlocks>,
) {
    let params = layout.params();
    if !layout.is_compressed() {
        dst.assign(&src);
        return;
    }

    match blocks {
        None => mirror_block(src, dst, params),
        Some(blocks) => {
            let width = params.full_block_len();
            for (i, blk) in blocks.blocks().iter().enumerate() {
                let stored = src.slice(s![blk.range.clone()]);
                let mut full = dst.slice_mut(s![i * width..(i + 1) * width]);
                if blk.is_same_species() {
                    mirror_block(stored, full, params);
                } else {
                    full.assign(&stored);
                }
            }
        }
    }
}

fn mirror_block(src: ArrayView1<'_, f64>, mut dst: ArrayViewMut1<'_, f64>, params: SoapParams) {
    let n_max = params.n_max;
    let mut k = 0;
    for l in 0..=params.l_max {
        let base = l * n_max * n_max;
        for n in 0..n_max {
            for np in n..n_max {
                let value = src[k];
                dst[base + n * n_max + np] = value;
                dst[base + np * n_max + n] = value;
                k += 1;
            }
        }
    }
}
