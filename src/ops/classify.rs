//! Nearest-reference classification of every (frame, atom) fingerprint.
//!
//! The source is processed `chunk_size` frames at a time: each chunk is read,
//! expanded to the full layout when stored compressed, optionally normalized,
//! and compared against every reference. Only one chunk is resident at a time.

use log::{debug, info};
use ndarray::{s, Array2, Array3, ArrayView1, ArrayView2, ArrayView3};
use thiserror::Error;

use super::distance::{DistanceKind, FingerprintDistance};
use super::normalize::normalize_lanes;
use super::reconstruct::expand_lanes;
use crate::adapters::source::FingerprintSource;
use crate::adapters::trajectory::TrajectoryError;
use crate::config::ClassifierConfig;
use crate::thread_pool::{map_range, WorkerPool};
use crate::types::catalog::ReferenceCatalog;
use crate::types::classification::{Classification, ClassificationError};
use crate::types::fingerprint::{FingerprintError, Layout};

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("reference catalog is empty")]
    EmptyCatalog,
    #[error("chunk size must be at least 1")]
    InvalidChunkSize,
    #[error("kernel power must be at least 1")]
    InvalidKernelPower,
    #[error("thread pool: {0}")]
    ThreadPool(String),
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),
    #[error(transparent)]
    Classification(#[from] ClassificationError),
}

/// Classify with the distance named in `config`.
pub fn classify<S>(
    source: &mut S,
    catalog: &ReferenceCatalog,
    config: &ClassifierConfig,
) -> Result<Classification, ClassifyError>
where
    S: FingerprintSource + ?Sized,
{
    check_distance(config.distance)?;
    classify_with(source, catalog, config, &config.distance)
}

/// Classify with a caller-supplied distance.
///
/// Each fingerprint gets the index of its closest reference; ties go to the
/// lowest index. The result does not depend on `chunk_size`.
pub fn classify_with<S, M>(
    source: &mut S,
    catalog: &ReferenceCatalog,
    config: &ClassifierConfig,
    metric: &M,
) -> Result<Classification, ClassifyError>
where
    S: FingerprintSource + ?Sized,
    M: FingerprintDistance + ?Sized,
{
    let (frames, atoms, _) = source.shape();
    let mut distances = Array2::<f64>::zeros((frames, atoms));
    let mut references = Array2::<usize>::zeros((frames, atoms));
    let spectra = catalog.spectra();

    for_each_chunk(source, catalog, config, |pool, start, chunk| {
        let (count, atoms, _) = chunk.dim();
        let nearest_refs = pool.install(|| {
            map_range(count * atoms, |i| {
                nearest(chunk.slice(s![i / atoms, i % atoms, ..]), spectra, metric)
            })
        });

        let end = start + count;
        let mut dist_out = distances.slice_mut(s![start..end, ..]);
        let mut ref_out = references.slice_mut(s![start..end, ..]);
        for (i, (index, distance)) in nearest_refs.into_iter().enumerate() {
            ref_out[[i / atoms, i % atoms]] = index;
            dist_out[[i / atoms, i % atoms]] = distance;
        }
    })?;

    info!(
        "classified {} frames x {} atoms against {} references",
        frames,
        atoms,
        catalog.len()
    );
    Ok(Classification::new(
        distances,
        references,
        catalog.names().to_vec(),
    )?)
}

/// Distance of every (frame, atom) fingerprint to every reference, as a
/// `(frames, atoms, references)` tensor.
pub fn distances_from_references<S>(
    source: &mut S,
    catalog: &ReferenceCatalog,
    config: &ClassifierConfig,
) -> Result<Array3<f64>, ClassifyError>
where
    S: FingerprintSource + ?Sized,
{
    check_distance(config.distance)?;
    let (frames, atoms, _) = source.shape();
    let n_refs = catalog.len();
    let mut out = Array3::<f64>::zeros((frames, atoms, n_refs));
    let spectra = catalog.spectra();
    let metric = &config.distance;

    for_each_chunk(source, catalog, config, |pool, start, chunk| {
        let (count, atoms, _) = chunk.dim();
        let values = pool.install(|| {
            map_range(count * atoms * n_refs, |i| {
                let lane = i / n_refs;
                metric.distance(
                    chunk.slice(s![lane / atoms, lane % atoms, ..]),
                    spectra.row(i % n_refs),
                )
            })
        });
        for (i, value) in values.into_iter().enumerate() {
            let lane = i / n_refs;
            out[[start + lane / atoms, lane % atoms, i % n_refs]] = value;
        }
    })?;

    Ok(out)
}

/// `K_0` is 1 for every pair, which would send every atom to reference 0.
fn check_distance(kind: DistanceKind) -> Result<(), ClassifyError> {
    match kind {
        DistanceKind::Kernel { power: 0 } => Err(ClassifyError::InvalidKernelPower),
        _ => Ok(()),
    }
}

/// Validate inputs, then hand every prepared chunk to `on_chunk` together with
/// the index of its first frame.
fn for_each_chunk<S, F>(
    source: &mut S,
    catalog: &ReferenceCatalog,
    config: &ClassifierConfig,
    mut on_chunk: F,
) -> Result<(), ClassifyError>
where
    S: FingerprintSource + ?Sized,
    F: FnMut(&WorkerPool, usize, ArrayView3<'_, f64>),
{
    if catalog.is_empty() {
        return Err(ClassifyError::EmptyCatalog);
    }
    if config.chunk_size == 0 {
        return Err(ClassifyError::InvalidChunkSize);
    }

    let (frames, atoms, len) = source.shape();
    let params = catalog.params();
    let layout = Layout::detect(len, params, source.species_blocks())?;
    if layout.full_len() != catalog.fingerprint_len() {
        return Err(FingerprintError::LengthMismatch {
            expected: catalog.fingerprint_len(),
            found: layout.full_len(),
        }
        .into());
    }

    let pool = WorkerPool::new(config.num_threads).map_err(ClassifyError::ThreadPool)?;

    let mut start = 0;
    while start < frames {
        let end = (start + config.chunk_size).min(frames);
        let raw = source.read_frames(start..end)?;
        let mut chunk = if layout.is_compressed() {
            expand_lanes(&raw, params, source.species_blocks())?
        } else {
            raw
        };
        if config.normalize {
            normalize_lanes(&mut chunk);
        }

        on_chunk(&pool, start, chunk.view());
        debug!("processed frames {start}..{end} of {frames} ({atoms} atoms)");
        start = end;
    }
    Ok(())
}

/// Index and distance of the closest reference. The first minimum wins, and a
/// NaN distance never beats a number.
fn nearest<M>(x: ArrayView1<'_, f64>, refs: ArrayView2<'_, f64>, metric: &M) -> (usize, f64)
where
    M: FingerprintDistance + ?Sized,
{
    let mut best = (0, f64::NAN);
    for (j, r) in refs.rows().into_iter().enumerate() {
        let d = metric.distance(x, r);
        if j == 0 || d < best.1 || (best.1.is_nan() && !d.is_nan()) {
            best = (j, d);
        }
    }
    best
}
