//! `SOAPTRJ1` fingerprint trajectory files.
//!
//! A minimal little-endian container for per-frame, per-atom fingerprints:
//! - Header: magic `SOAPTRJ1`, then `frames, atoms, len, l_max, n_max` as u32
//! - Species: u32 count, then per species a u8 length and UTF-8 bytes
//! - Blocks: u32 count, then per block a u8 key length, the pair key
//!   (e.g. `HO`), u32 start and u32 stop
//! - Data: `frames * atoms * len` f64 values, frame-major
//!
//! A file with no block table holds single-species fingerprints.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::Path;

use ndarray::{Array3, ArrayView3};
use thiserror::Error;

use super::source::FingerprintSource;
use crate::types::fingerprint::{FingerprintError, SoapParams, SpeciesBlocks};

pub const TRAJECTORY_MAGIC: &[u8; 8] = b"SOAPTRJ1";

#[derive(Error, Debug)]
pub enum TrajectoryError {
    #[error("not a fingerprint trajectory: {0}")]
    NotATrajectory(String),
    #[error("invalid fingerprint trajectory: {0}")]
    InvalidFormat(String),
    #[error("frames {start}..{end} out of range for a trajectory of {frames} frames")]
    FrameOutOfRange {
        start: usize,
        end: usize,
        frames: usize,
    },
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Parsed trajectory header.
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintHeader {
    pub frames: usize,
    pub atoms: usize,
    /// Stored length of every fingerprint.
    pub len: usize,
    pub params: SoapParams,
    pub species: Vec<String>,
    pub blocks: Option<SpeciesBlocks>,
}

impl FingerprintHeader {
    /// Header for single-species fingerprints of length `len`.
    pub fn new(frames: usize, atoms: usize, len: usize, params: SoapParams) -> Self {
        Self {
            frames,
            atoms,
            len,
            params,
            species: Vec::new(),
            blocks: None,
        }
    }

    /// Attach a multi-species block layout; also records its species list.
    pub fn with_species_blocks(mut self, blocks: SpeciesBlocks) -> Self {
        self.species = blocks.species().to_vec();
        self.blocks = Some(blocks);
        self
    }

    /// Byte size of one frame, `None` on overflow.
    fn frame_bytes(&self) -> Option<u64> {
        (self.atoms as u64)
            .checked_mul(self.len as u64)?
            .checked_mul(8)
    }
}

/// Streaming reader over any `Read + Seek` source. Frame ranges are read by
/// seeking, so only the requested frames are loaded.
pub struct FingerprintReader<R: Read + Seek> {
    reader: R,
    pub header: FingerprintHeader,
    data_offset: u64,
    frame_bytes: u64,
}

impl FingerprintReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, TrajectoryError> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> FingerprintReader<R> {
    /// Parse the header and check that the stream holds exactly the frame
    /// data it declares.
    pub fn new(mut reader: R) -> Result<Self, TrajectoryError> {
        let header = parse_header(&mut reader)?;
        let data_offset = reader.stream_position()?;

        let oversized = || {
            TrajectoryError::InvalidFormat(format!(
                "{} frames of {} atoms x {} values do not fit in a file",
                header.frames, header.atoms, header.len
            ))
        };
        let frame_bytes = header.frame_bytes().ok_or_else(oversized)?;
        let expected = frame_bytes
            .checked_mul(header.frames as u64)
            .and_then(|b| b.checked_add(data_offset))
            .ok_or_else(oversized)?;
        let stream_len = reader.seek(SeekFrom::End(0))?;
        if stream_len != expected {
            return Err(TrajectoryError::InvalidFormat(format!(
                "header declares {expected} bytes, stream holds {stream_len}"
            )));
        }

        Ok(Self {
            reader,
            header,
            data_offset,
            frame_bytes,
        })
    }

    /// Read frames `range` into a `(frames, atoms, len)` array.
    pub fn read_range(&mut self, range: Range<usize>) -> Result<Array3<f64>, TrajectoryError> {
        if range.start > range.end || range.end > self.header.frames {
            return Err(TrajectoryError::FrameOutOfRange {
                start: range.start,
                end: range.end,
                frames: self.header.frames,
            });
        }
        let count = range.end - range.start;
        let (atoms, len) = (self.header.atoms, self.header.len);

        // bounded by the stream length checked in `new`
        let offset = self.data_offset + range.start as u64 * self.frame_bytes;
        let size = usize::try_from(count as u64 * self.frame_bytes).map_err(|_| {
            TrajectoryError::InvalidFormat(format!("{count} frames exceed addressable memory"))
        })?;
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; size];
        self.reader.read_exact(&mut buf)?;

        let values: Vec<f64> = buf
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect();
        Array3::from_shape_vec((count, atoms, len), values)
            .map_err(|e| TrajectoryError::InvalidFormat(format!("frame data shape: {e}")))
    }
}

impl<R: Read + Seek> FingerprintSource for FingerprintReader<R> {
    fn shape(&self) -> (usize, usize, usize) {
        (self.header.frames, self.header.atoms, self.header.len)
    }

    fn read_frames(&mut self, range: Range<usize>) -> Result<Array3<f64>, TrajectoryError> {
        self.read_range(range)
    }

    fn species_blocks(&self) -> Option<&SpeciesBlocks> {
        self.header.blocks.as_ref()
    }
}

/// Write a complete trajectory. `data` must be `(frames, atoms, len)` as
/// declared by `header`.
pub fn write_fingerprint_trajectory<W: Write>(
    writer: &mut W,
    header: &FingerprintHeader,
    data: ArrayView3<'_, f64>,
) -> Result<(), TrajectoryError> {
    let expected = (header.frames, header.atoms, header.len);
    if data.dim() != expected {
        return Err(TrajectoryError::InvalidFormat(format!(
            "data shape {:?} does not match header {:?}",
            data.dim(),
            expected
        )));
    }

    writer.write_all(TRAJECTORY_MAGIC)?;
    for value in [
        header.frames,
        header.atoms,
        header.len,
        header.params.l_max,
        header.params.n_max,
    ] {
        write_u32(writer, value)?;
    }

    write_u32(writer, header.species.len())?;
    for species in &header.species {
        write_short_str(writer, species)?;
    }

    let blocks = header.blocks.as_ref().map(|b| b.blocks()).unwrap_or_default();
    write_u32(writer, blocks.len())?;
    for blk in blocks {
        write_short_str(writer, &format!("{}{}", blk.first, blk.second))?;
        write_u32(writer, blk.range.start)?;
        write_u32(writer, blk.range.end)?;
    }

    for value in data.iter() {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

/// Convenience: write a trajectory file at `path`.
pub fn write_fingerprint_file(
    path: &Path,
    header: &FingerprintHeader,
    data: ArrayView3<'_, f64>,
) -> Result<(), TrajectoryError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_fingerprint_trajectory(&mut writer, header, data)
}

fn write_u32<W: Write>(w: &mut W, value: usize) -> Result<(), TrajectoryError> {
    let value = u32::try_from(value)
        .map_err(|_| TrajectoryError::InvalidFormat(format!("{value} does not fit in u32")))?;
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_short_str<W: Write>(w: &mut W, s: &str) -> Result<(), TrajectoryError> {
    let len = u8::try_from(s.len())
        .map_err(|_| TrajectoryError::InvalidFormat(format!("name too long: {s}")))?;
    w.write_all(&[len])?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn read_u32(r: &mut impl Read) -> io::Result<usize> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf) as usize)
}

fn read_short_str(r: &mut impl Read) -> Result<String, TrajectoryError> {
    let mut len = [0u8; 1];
    r.read_exact(&mut len)?;
    let mut buf = vec![0u8; len[0] as usize];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| TrajectoryError::InvalidFormat(format!("utf8: {e}")))
}

fn parse_header(r: &mut impl Read) -> Result<FingerprintHeader, TrajectoryError> {
    let mut magic = [0u8; 8];
    r.read_exact(&mut magic).map_err(|e| {
        TrajectoryError::NotATrajectory(format!("cannot read magic: {e}"))
    })?;
    if &magic != TRAJECTORY_MAGIC {
        return Err(TrajectoryError::NotATrajectory(format!(
            "expected magic SOAPTRJ1, got {:?}",
            magic
        )));
    }

    let mut fields = [0usize; 5];
    for field in fields.iter_mut() {
        *field = read_u32(r)
            .map_err(|e| TrajectoryError::NotATrajectory(format!("truncated header: {e}")))?;
    }
    let [frames, atoms, len, l_max, n_max] = fields;
    let params = SoapParams::checked(l_max, n_max)
        .map_err(|e| TrajectoryError::InvalidFormat(e.to_string()))?;

    let species = (0..read_u32(r)?)
        .map(|_| read_short_str(r))
        .collect::<Result<Vec<_>, _>>()?;

    let block_count = read_u32(r)?;
    let mut attrs = HashMap::new();
    for _ in 0..block_count {
        let key = read_short_str(r)?;
        let start = read_u32(r)?;
        let stop = read_u32(r)?;
        attrs.insert(key, (start, stop));
    }
    let blocks = if attrs.is_empty() {
        None
    } else {
        Some(SpeciesBlocks::from_attrs(&species, &attrs, params)?)
    };

    Ok(FingerprintHeader {
        frames,
        atoms,
        len,
        params,
        species,
        blocks,
    })
}
