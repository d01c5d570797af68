//! Fingerprint sources and on-disk formats.

pub mod references;
pub mod source;
pub mod trajectory;

// Re-export commonly used items
pub use references::{
    deserialize_references, load_references, save_references, serialize_references,
};
pub use source::{FingerprintSource, InMemorySource};
pub use trajectory::{
    write_fingerprint_file, write_fingerprint_trajectory, FingerprintHeader, FingerprintReader,
    TrajectoryError, TRAJECTORY_MAGIC,
};
