//! Operations on fingerprints, classifications and event histories.

pub mod classify;
pub mod distance;
pub mod kinetics;
pub mod normalize;
pub mod reconstruct;
pub mod references;
pub mod tracker;

// Re-export commonly used items
pub use classify::{classify, classify_with, distances_from_references, ClassifyError};
pub use distance::{
    distance, kernel, normalized_distance, simple_distance, simple_kernel, DistanceKind,
    FingerprintDistance,
};
pub use kinetics::{
    calculate_residence_times, calculate_transition_matrix, normalize_matrix, residence_times,
    residence_times_from_tracker, transition_matrix, transition_matrix_from_tracker,
    KineticsError,
};
pub use normalize::{norm, normalize_lanes, normalize_vector, normalized};
pub use reconstruct::{expand_lanes, expand_vector};
pub use references::build_references;
pub use tracker::{strip_atom_identity, track_atom, track_states};
