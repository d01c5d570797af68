//! Fingerprint layout: compression parameters, species-pair blocks, and the
//! compressed/full layout check.
//!
//! A fingerprint is stored either *full* (every species-pair block expanded to
//! `(l_max+1) * n_max^2` values) or *compressed*:
//! - same-species blocks keep only the upper triangle `n <= n'` of each
//!   `n_max x n_max` radial block, for every angular index `l`
//! - cross-species blocks are stored once per unordered pair, already full
//!
//! [`Layout::detect`] is the single place where a vector length is matched
//! against these two conventions.

use std::collections::HashMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a fingerprint does not fit the declared layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    #[error(
        "fingerprint length {len} matches neither the compressed size ({compressed}) \
         nor the full size ({full}) for l_max={l_max}, n_max={n_max}"
    )]
    DimensionMismatch {
        len: usize,
        compressed: usize,
        full: usize,
        l_max: usize,
        n_max: usize,
    },
    #[error("fingerprint length mismatch: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("unknown species pair key: {0}")]
    UnknownSpeciesPair(String),
    #[error("invalid species blocks: {0}")]
    InvalidBlocks(String),
    #[error("block sizes for l_max={l_max}, n_max={n_max} overflow")]
    ParamsTooLarge { l_max: usize, n_max: usize },
}

/// Angular (`l_max`) and radial (`n_max`) bounds a fingerprint was produced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SoapParams {
    pub l_max: usize,
    pub n_max: usize,
}

impl SoapParams {
    pub fn new(l_max: usize, n_max: usize) -> Self {
        Self { l_max, n_max }
    }

    /// Bounds read from a file: both block lengths must fit in `usize`.
    pub fn checked(l_max: usize, n_max: usize) -> Result<Self, FingerprintError> {
        let params = Self::new(l_max, n_max);
        let upper = l_max
            .checked_add(1)
            .zip(n_max.checked_add(1).and_then(|n1| n_max.checked_mul(n1)))
            .and_then(|(l1, pairs)| l1.checked_mul(pairs / 2));
        let full = l_max
            .checked_add(1)
            .and_then(|l1| l1.checked_mul(n_max))
            .and_then(|v| v.checked_mul(n_max));
        match (upper, full) {
            (Some(_), Some(_)) => Ok(params),
            _ => Err(FingerprintError::ParamsTooLarge { l_max, n_max }),
        }
    }

    /// Length of one compressed same-species block: `(l_max+1) * n_max*(n_max+1)/2`.
    pub fn upper_block_len(&self) -> usize {
        (self.l_max + 1) * (self.n_max * (self.n_max + 1) / 2)
    }

    /// Length of one full block: `(l_max+1) * n_max^2`.
    pub fn full_block_len(&self) -> usize {
        (self.l_max + 1) * self.n_max * self.n_max
    }
}

/// One species-pair block inside a compressed fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesBlock {
    pub first: String,
    pub second: String,
    /// Offsets of the block inside the compressed vector.
    pub range: Range<usize>,
}

impl SpeciesBlock {
    pub fn is_same_species(&self) -> bool {
        self.first == self.second
    }

    fn matches(&self, a: &str, b: &str) -> bool {
        (self.first == a && self.second == b) || (self.first == b && self.second == a)
    }
}

/// Ordered species-pair blocks of a multi-species fingerprint.
///
/// Blocks are contiguous, start at offset 0 and appear in storage order. A
/// cross-species pair is stored once, so `slice("H", "O")` and
/// `slice("O", "H")` return the same range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesBlocks {
    species: Vec<String>,
    blocks: Vec<SpeciesBlock>,
}

impl SpeciesBlocks {
    /// Derive the block layout analytically from an ordered species list.
    ///
    /// For every species `i` and every `j >= i` in list order a block is laid
    /// out; with `crossover == false` only the `j == i` blocks exist.
    pub fn from_species<S: AsRef<str>>(species: &[S], params: SoapParams, crossover: bool) -> Self {
        let species: Vec<String> = species.iter().map(|s| s.as_ref().to_string()).collect();
        let mut blocks = Vec::new();
        let mut offset = 0;
        for (i, a) in species.iter().enumerate() {
            for b in &species[i..] {
                if a != b && !crossover {
                    continue;
                }
                let len = if a == b {
                    params.upper_block_len()
                } else {
                    params.full_block_len()
                };
                blocks.push(SpeciesBlock {
                    first: a.clone(),
                    second: b.clone(),
                    range: offset..offset + len,
                });
                offset += len;
            }
        }
        Self { species, blocks }
    }

    /// Build the block layout from an attribute map of pair keys to
    /// `(start, stop)` offsets, e.g. `"HO" -> (10, 42)`.
    ///
    /// Keys are the concatenation of two species symbols. A reversed key
    /// (`"OH"`) describing the same range is folded into the same block.
    pub fn from_attrs<S: AsRef<str>>(
        species: &[S],
        attrs: &HashMap<String, (usize, usize)>,
        params: SoapParams,
    ) -> Result<Self, FingerprintError> {
        let species: Vec<String> = species.iter().map(|s| s.as_ref().to_string()).collect();
        let mut blocks: Vec<SpeciesBlock> = Vec::with_capacity(attrs.len());

        for (key, &(start, stop)) in attrs {
            let (a, b) = split_pair_key(key, &species)
                .ok_or_else(|| FingerprintError::UnknownSpeciesPair(key.clone()))?;
            if stop < start {
                return Err(FingerprintError::InvalidBlocks(format!(
                    "block {key} has stop {stop} before start {start}"
                )));
            }
            if let Some(existing) = blocks.iter().find(|blk| blk.matches(a, b)) {
                if existing.range != (start..stop) {
                    return Err(FingerprintError::InvalidBlocks(format!(
                        "pair {key} maps to {start}..{stop} but its reverse maps to {:?}",
                        existing.range
                    )));
                }
                continue;
            }
            // keep species-list order inside the pair, whichever key came first
            let (first, second) = if species_index(&species, a) <= species_index(&species, b) {
                (a, b)
            } else {
                (b, a)
            };
            blocks.push(SpeciesBlock {
                first: first.to_string(),
                second: second.to_string(),
                range: start..stop,
            });
        }

        blocks.sort_by_key(|blk| blk.range.start);

        let mut expected_start = 0;
        for blk in &blocks {
            if blk.range.start != expected_start {
                return Err(FingerprintError::InvalidBlocks(format!(
                    "block {}{} starts at {} but the previous block ends at {expected_start}",
                    blk.first, blk.second, blk.range.start
                )));
            }
            let expected_len = if blk.is_same_species() {
                params.upper_block_len()
            } else {
                params.full_block_len()
            };
            if blk.range.len() != expected_len {
                return Err(FingerprintError::InvalidBlocks(format!(
                    "block {}{} has length {}, expected {expected_len}",
                    blk.first,
                    blk.second,
                    blk.range.len()
                )));
            }
            expected_start = blk.range.end;
        }

        Ok(Self { species, blocks })
    }

    pub fn species(&self) -> &[String] {
        &self.species
    }

    pub fn blocks(&self) -> &[SpeciesBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total length of the compressed vector described by these blocks.
    pub fn compressed_len(&self) -> usize {
        self.blocks.last().map_or(0, |blk| blk.range.end)
    }

    /// Total length of the expanded vector: one full block per stored pair.
    pub fn full_len(&self, params: SoapParams) -> usize {
        self.blocks.len() * params.full_block_len()
    }

    /// Range of pair `(a, b)` in the compressed vector; argument order does not matter.
    pub fn slice(&self, a: &str, b: &str) -> Option<Range<usize>> {
        self.blocks
            .iter()
            .find(|blk| blk.matches(a, b))
            .map(|blk| blk.range.clone())
    }

    /// Range of pair `(a, b)` in the expanded vector; argument order does not matter.
    pub fn full_slice(&self, a: &str, b: &str, params: SoapParams) -> Option<Range<usize>> {
        let width = params.full_block_len();
        self.blocks
            .iter()
            .position(|blk| blk.matches(a, b))
            .map(|i| i * width..(i + 1) * width)
    }

    /// Attribute-map form of the blocks, with both orders for cross-species pairs.
    pub fn to_attrs(&self) -> HashMap<String, (usize, usize)> {
        let mut attrs = HashMap::with_capacity(self.blocks.len() * 2);
        for blk in &self.blocks {
            let range = (blk.range.start, blk.range.end);
            attrs.insert(format!("{}{}", blk.first, blk.second), range);
            if !blk.is_same_species() {
                attrs.insert(format!("{}{}", blk.second, blk.first), range);
            }
        }
        attrs
    }
}

/// Split a pair key such as `"HO"` or `"CaO"` against the known species.
fn split_pair_key<'a>(key: &str, species: &'a [String]) -> Option<(&'a str, &'a str)> {
    species.iter().find_map(|a| {
        let rest = key.strip_prefix(a.as_str())?;
        species
            .iter()
            .find(|b| b.as_str() == rest)
            .map(|b| (a.as_str(), b.as_str()))
    })
}

fn species_index(species: &[String], name: &str) -> usize {
    species
        .iter()
        .position(|s| s == name)
        .unwrap_or(species.len())
}

/// Storage convention of a fingerprint of a given length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Compressed {
        params: SoapParams,
        compressed_len: usize,
        full_len: usize,
    },
    Full {
        params: SoapParams,
        full_len: usize,
    },
}

impl Layout {
    /// Resolve the layout of a vector of length `len`.
    ///
    /// Without `blocks` the single-species sizes apply. When the compressed and
    /// full sizes coincide (`n_max <= 1`) the vector is treated as full.
    pub fn detect(
        len: usize,
        params: SoapParams,
        blocks: Option<&SpeciesBlocks>,
    ) -> Result<Self, FingerprintError> {
        let (compressed_len, full_len) = match blocks {
            Some(b) => (b.compressed_len(), b.full_len(params)),
            None => (params.upper_block_len(), params.full_block_len()),
        };

        if len == full_len {
            Ok(Layout::Full { params, full_len })
        } else if len == compressed_len {
            Ok(Layout::Compressed {
                params,
                compressed_len,
                full_len,
            })
        } else {
            Err(FingerprintError::DimensionMismatch {
                len,
                compressed: compressed_len,
                full: full_len,
                l_max: params.l_max,
                n_max: params.n_max,
            })
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, Layout::Compressed { .. })
    }

    pub fn params(&self) -> SoapParams {
        match self {
            Layout::Compressed { params, .. } | Layout::Full { params, .. } => *params,
        }
    }

    /// Length of the vector once expanded.
    pub fn full_len(&self) -> usize {
        match self {
            Layout::Compressed { full_len, .. } | Layout::Full { full_len, .. } => *full_len,
        }
    }

    /// Length of the vector as stored.
    pub fn stored_len(&self) -> usize {
        match self {
            Layout::Compressed { compressed_len, .. } => *compressed_len,
            Layout::Full { full_len, .. } => *full_len,
        }
    }
}
