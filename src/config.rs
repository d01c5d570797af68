//! Classifier configuration.

use serde::{Deserialize, Serialize};

use crate::ops::distance::DistanceKind;

/// Options for [`crate::ops::classify::classify`].
///
/// Missing fields take their defaults when deserialized, so a partial JSON
/// object such as `{"chunk_size": 500}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Frames read and processed per step. Bounds peak memory.
    pub chunk_size: usize,
    /// L2-normalize source fingerprints before comparing.
    pub normalize: bool,
    pub distance: DistanceKind,
    /// Worker threads; `None` uses the global pool.
    pub num_threads: Option<usize>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            normalize: false,
            distance: DistanceKind::Simple,
            num_threads: None,
        }
    }
}

impl ClassifierConfig {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_distance(mut self, distance: DistanceKind) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }
}
