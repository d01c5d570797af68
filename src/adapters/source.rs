//! Chunked access to `(frames, atoms, len)` fingerprint data.

use std::ops::Range;

use ndarray::{s, Array3, ArrayView3};

use super::trajectory::TrajectoryError;
use crate::types::fingerprint::SpeciesBlocks;

/// A fingerprint dataset that can be read a frame range at a time.
pub trait FingerprintSource {
    /// `(frames, atoms, len)` of the stored data.
    fn shape(&self) -> (usize, usize, usize);

    /// Frames `range` as an owned `(range.len(), atoms, len)` array.
    fn read_frames(&mut self, range: Range<usize>) -> Result<Array3<f64>, TrajectoryError>;

    /// Block layout for multi-species fingerprints, `None` for a single species.
    fn species_blocks(&self) -> Option<&SpeciesBlocks> {
        None
    }
}

fn slice_frames(
    data: ArrayView3<'_, f64>,
    range: Range<usize>,
) -> Result<Array3<f64>, TrajectoryError> {
    let frames = data.len_of(ndarray::Axis(0));
    if range.start > range.end || range.end > frames {
        return Err(TrajectoryError::FrameOutOfRange {
            start: range.start,
            end: range.end,
            frames,
        });
    }
    Ok(data.slice(s![range, .., ..]).to_owned())
}

impl FingerprintSource for ArrayView3<'_, f64> {
    fn shape(&self) -> (usize, usize, usize) {
        self.dim()
    }

    fn read_frames(&mut self, range: Range<usize>) -> Result<Array3<f64>, TrajectoryError> {
        slice_frames(self.view(), range)
    }
}

impl FingerprintSource for Array3<f64> {
    fn shape(&self) -> (usize, usize, usize) {
        self.dim()
    }

    fn read_frames(&mut self, range: Range<usize>) -> Result<Array3<f64>, TrajectoryError> {
        slice_frames(self.view(), range)
    }
}

/// In-memory dataset carrying its species-block layout.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    data: Array3<f64>,
    blocks: Option<SpeciesBlocks>,
}

impl InMemorySource {
    pub fn new(data: Array3<f64>) -> Self {
        Self { data, blocks: None }
    }

    pub fn with_species_blocks(mut self, blocks: SpeciesBlocks) -> Self {
        self.blocks = Some(blocks);
        self
    }
}

impl FingerprintSource for InMemorySource {
    fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    fn read_frames(&mut self, range: Range<usize>) -> Result<Array3<f64>, TrajectoryError> {
        slice_frames(self.data.view(), range)
    }

    fn species_blocks(&self) -> Option<&SpeciesBlocks> {
        self.blocks.as_ref()
    }
}
