//! Transition matrices and residence times, computed either directly from a
//! classification or from tracked events.
//!
//! Matrices are unnormalized counts: `matrix[[from, to]]` is the number of
//! `(frame - stride, frame)` pairs, over all atoms, going from `from` to `to`.
//! Residence times are grouped by state and sorted; a negative entry is a run
//! cut short by the end of the trajectory.

use ndarray::{Array2, ArrayView2, Axis};
use thiserror::Error;

use crate::thread_pool::{map_range, map_reduce};
use crate::types::classification::Classification;
use crate::types::event::{Event, EventHistory};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KineticsError {
    #[error("stride must be at least 1")]
    InvalidStride,
    #[error("tracked events only describe stride 1, got stride {0}")]
    TrackerStride(usize),
    #[error("state {state} is outside the {n_states} known states")]
    StateOutOfRange { state: usize, n_states: usize },
}

/// Count transitions between frames `stride` apart.
pub fn transition_matrix(
    classification: &Classification,
    stride: usize,
) -> Result<Array2<f64>, KineticsError> {
    if stride == 0 {
        return Err(KineticsError::InvalidStride);
    }
    let n = classification.num_states();
    let frames = classification.num_frames();

    // one partial matrix per atom, summed at the end
    Ok(map_reduce(
        classification.num_atoms(),
        |atom| {
            let states = classification.atom_states(atom);
            let mut partial = Array2::<f64>::zeros((n, n));
            for frame in stride..frames {
                partial[[states[frame - stride], states[frame]]] += 1.0;
            }
            partial
        },
        || Array2::zeros((n, n)),
        |a, b| a + b,
    ))
}

/// Stride-1 transition matrix rebuilt from tracked events.
///
/// An event stays `duration` frames in its state after entering it, so it
/// adds `duration - 1` self transitions and one `previous -> current` entry.
pub fn transition_matrix_from_tracker<H>(
    history: &H,
    n_states: usize,
) -> Result<Array2<f64>, KineticsError>
where
    H: EventHistory + ?Sized,
{
    let mut matrix = Array2::zeros((n_states, n_states));
    for event in history.iter_events() {
        check_event(event, n_states)?;
        matrix[[event.current, event.current]] += event.duration as f64 - 1.0;
        matrix[[event.previous, event.current]] += 1.0;
    }
    Ok(matrix)
}

/// Transition matrix from the events in `tracker` when given, otherwise by
/// direct counting.
pub fn calculate_transition_matrix(
    classification: &Classification,
    stride: usize,
    tracker: Option<&[Vec<Event>]>,
) -> Result<Array2<f64>, KineticsError> {
    match tracker {
        Some(_) if stride != 1 => Err(KineticsError::TrackerStride(stride)),
        Some(history) => transition_matrix_from_tracker(history, classification.num_states()),
        None => transition_matrix(classification, stride),
    }
}

/// Residence times by scanning every atom's timeline.
pub fn residence_times(classification: &Classification) -> Vec<Vec<i64>> {
    let per_atom = map_range(classification.num_atoms(), |atom| {
        let states = classification.atom_states(atom);
        let mut runs = Vec::new();
        let Some(&first) = states.first() else {
            return runs;
        };
        let mut current = first;
        let mut time = 0i64;
        for &state in states.iter().skip(1) {
            if state != current {
                runs.push((current, time));
                time = 0;
                current = state;
            }
            time += 1;
        }
        runs.push((current, -time));
        runs
    });

    let mut buckets = vec![Vec::new(); classification.num_states()];
    for (state, time) in per_atom.into_iter().flatten() {
        buckets[state].push(time);
    }
    sort_buckets(buckets)
}

/// Residence times from tracked events: `duration` for a completed run,
/// `-duration` for the last run of an atom.
pub fn residence_times_from_tracker<H>(
    history: &H,
    n_states: usize,
) -> Result<Vec<Vec<i64>>, KineticsError>
where
    H: EventHistory + ?Sized,
{
    let mut buckets = vec![Vec::new(); n_states];
    for event in history.iter_events() {
        check_event(event, n_states)?;
        let duration = event.duration as i64;
        buckets[event.current].push(if event.is_last() { -duration } else { duration });
    }
    Ok(sort_buckets(buckets))
}

/// Residence times from the events in `tracker` when given, otherwise by
/// scanning the classification.
pub fn calculate_residence_times(
    classification: &Classification,
    tracker: Option<&[Vec<Event>]>,
) -> Result<Vec<Vec<i64>>, KineticsError> {
    match tracker {
        Some(history) => residence_times_from_tracker(history, classification.num_states()),
        None => Ok(residence_times(classification)),
    }
}

/// Row-normalized copy of `matrix`; rows that sum to zero stay zero.
pub fn normalize_matrix(matrix: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut out = matrix.to_owned();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let total = row.sum();
        if total != 0.0 {
            row /= total;
        }
    }
    out
}

fn check_event(event: &Event, n_states: usize) -> Result<(), KineticsError> {
    let worst = event.previous.max(event.current).max(event.next);
    if worst >= n_states {
        return Err(KineticsError::StateOutOfRange {
            state: worst,
            n_states,
        });
    }
    Ok(())
}

fn sort_buckets(mut buckets: Vec<Vec<i64>>) -> Vec<Vec<i64>> {
    for bucket in &mut buckets {
        bucket.sort_unstable();
    }
    buckets
}
