//! Reference catalog persistence.
//!
//! A catalog is stored as a gzip-compressed MessagePack map:
//! - `format`: `"soapify-references"`, `version`: 1
//! - `names`: array of strings
//! - `l_max`, `n_max`: unsigned integers
//! - `shape`: `[rows, cols]` of the fingerprint table
//! - `spectra`: bin of `rows * cols` big-endian f64 values, row-major
//!
//! Loading accepts both gzipped and raw MessagePack.

use std::borrow::Cow;
use std::io::{Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::Array2;
use rmp::decode;

use crate::types::catalog::{CatalogError, ReferenceCatalog};
use crate::types::fingerprint::SoapParams;

const FORMAT_NAME: &str = "soapify-references";
const FORMAT_VERSION: u64 = 1;

/// Encode a catalog to gzipped MessagePack bytes.
pub fn serialize_references(catalog: &ReferenceCatalog) -> Result<Vec<u8>, CatalogError> {
    let packed = encode_msgpack(catalog)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&packed)?;
    Ok(encoder.finish()?)
}

/// Decode catalog bytes (gzipped or raw MessagePack).
pub fn deserialize_references(bytes: &[u8]) -> Result<ReferenceCatalog, CatalogError> {
    let data = inflate(bytes)?;
    decode_msgpack(&data)
}

pub fn save_references(path: &Path, catalog: &ReferenceCatalog) -> Result<(), CatalogError> {
    std::fs::write(path, serialize_references(catalog)?)?;
    Ok(())
}

pub fn load_references(path: &Path) -> Result<ReferenceCatalog, CatalogError> {
    let bytes = std::fs::read(path)?;
    deserialize_references(&bytes)
}

fn encode_msgpack(catalog: &ReferenceCatalog) -> Result<Vec<u8>, CatalogError> {
    use rmp::encode;

    let fail = |what: &str, e: &dyn std::fmt::Debug| {
        CatalogError::InvalidFormat(format!("msgpack write {what}: {e:?}"))
    };
    let spectra = catalog.spectra();
    let mut buf = Vec::new();

    encode::write_map_len(&mut buf, 7).map_err(|e| fail("map", &e))?;

    encode::write_str(&mut buf, "format").map_err(|e| fail("key", &e))?;
    encode::write_str(&mut buf, FORMAT_NAME).map_err(|e| fail("format", &e))?;
    encode::write_str(&mut buf, "version").map_err(|e| fail("key", &e))?;
    encode::write_uint(&mut buf, FORMAT_VERSION).map_err(|e| fail("version", &e))?;

    encode::write_str(&mut buf, "names").map_err(|e| fail("key", &e))?;
    encode::write_array_len(&mut buf, catalog.len() as u32).map_err(|e| fail("names", &e))?;
    for name in catalog.names() {
        encode::write_str(&mut buf, name).map_err(|e| fail("name", &e))?;
    }

    let params = catalog.params();
    encode::write_str(&mut buf, "l_max").map_err(|e| fail("key", &e))?;
    encode::write_uint(&mut buf, params.l_max as u64).map_err(|e| fail("l_max", &e))?;
    encode::write_str(&mut buf, "n_max").map_err(|e| fail("key", &e))?;
    encode::write_uint(&mut buf, params.n_max as u64).map_err(|e| fail("n_max", &e))?;

    encode::write_str(&mut buf, "shape").map_err(|e| fail("key", &e))?;
    encode::write_array_len(&mut buf, 2).map_err(|e| fail("shape", &e))?;
    encode::write_uint(&mut buf, spectra.nrows() as u64).map_err(|e| fail("shape", &e))?;
    encode::write_uint(&mut buf, spectra.ncols() as u64).map_err(|e| fail("shape", &e))?;

    let bytes: Vec<u8> = spectra.iter().flat_map(|v| v.to_be_bytes()).collect();
    encode::write_str(&mut buf, "spectra").map_err(|e| fail("key", &e))?;
    encode::write_bin(&mut buf, &bytes).map_err(|e| fail("spectra", &e))?;

    Ok(buf)
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

fn inflate(bytes: &[u8]) -> Result<Cow<'_, [u8]>, CatalogError> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(Cow::Borrowed(bytes));
    }
    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| CatalogError::InvalidFormat(format!("gzip stream: {e}")))?;
    Ok(Cow::Owned(out))
}

fn malformed(what: &str, e: impl std::fmt::Debug) -> CatalogError {
    CatalogError::InvalidFormat(format!("msgpack read {what}: {e:?}"))
}

/// Split `len` bytes off the front of `rd`.
fn take<'a>(rd: &mut &'a [u8], len: u32, what: &str) -> Result<&'a [u8], CatalogError> {
    let len = len as usize;
    let bytes: &'a [u8] = *rd;
    if bytes.len() < len {
        return Err(CatalogError::InvalidFormat(format!(
            "{what} needs {len} bytes, {} left",
            bytes.len()
        )));
    }
    let (head, tail) = bytes.split_at(len);
    *rd = tail;
    Ok(head)
}

fn read_str<'a>(rd: &mut &'a [u8], what: &str) -> Result<&'a str, CatalogError> {
    let len = decode::read_str_len(rd).map_err(|e| malformed(what, e))?;
    std::str::from_utf8(take(rd, len, what)?)
        .map_err(|e| CatalogError::InvalidFormat(format!("{what} is not UTF-8: {e}")))
}

fn read_usize(rd: &mut &[u8], what: &str) -> Result<usize, CatalogError> {
    let value: u64 = decode::read_int(rd).map_err(|e| malformed(what, e))?;
    usize::try_from(value)
        .map_err(|_| CatalogError::InvalidFormat(format!("{what} {value} does not fit in usize")))
}

fn required<T>(value: Option<T>, key: &str) -> Result<T, CatalogError> {
    value.ok_or_else(|| CatalogError::InvalidFormat(format!("missing field: {key}")))
}

/// Fields of a catalog map, in whatever order they were written.
#[derive(Default)]
struct CatalogFields<'a> {
    format: Option<&'a str>,
    version: Option<usize>,
    names: Option<Vec<String>>,
    l_max: Option<usize>,
    n_max: Option<usize>,
    shape: Option<(usize, usize)>,
    spectra: Option<&'a [u8]>,
}

fn decode_msgpack(mut rd: &[u8]) -> Result<ReferenceCatalog, CatalogError> {
    let entries = decode::read_map_len(&mut rd).map_err(|e| malformed("catalog map", e))?;
    let mut fields = CatalogFields::default();

    for _ in 0..entries {
        match read_str(&mut rd, "field name")? {
            "format" => fields.format = Some(read_str(&mut rd, "format")?),
            "version" => fields.version = Some(read_usize(&mut rd, "version")?),
            "names" => {
                let count = decode::read_array_len(&mut rd).map_err(|e| malformed("names", e))?;
                let names = (0..count)
                    .map(|_| read_str(&mut rd, "name").map(str::to_string))
                    .collect::<Result<Vec<_>, _>>()?;
                fields.names = Some(names);
            }
            "l_max" => fields.l_max = Some(read_usize(&mut rd, "l_max")?),
            "n_max" => fields.n_max = Some(read_usize(&mut rd, "n_max")?),
            "shape" => {
                let dims = decode::read_array_len(&mut rd).map_err(|e| malformed("shape", e))?;
                if dims != 2 {
                    return Err(CatalogError::InvalidFormat(format!(
                        "shape has {dims} entries, expected 2"
                    )));
                }
                let rows = read_usize(&mut rd, "row count")?;
                let cols = read_usize(&mut rd, "column count")?;
                fields.shape = Some((rows, cols));
            }
            "spectra" => {
                let len = decode::read_bin_len(&mut rd).map_err(|e| malformed("spectra", e))?;
                fields.spectra = Some(take(&mut rd, len, "spectra")?);
            }
            other => {
                return Err(CatalogError::InvalidFormat(format!("unknown field: {other}")));
            }
        }
    }
    if !rd.is_empty() {
        return Err(CatalogError::InvalidFormat(format!(
            "{} trailing bytes after the catalog",
            rd.len()
        )));
    }
    catalog_from_fields(fields)
}

fn catalog_from_fields(fields: CatalogFields<'_>) -> Result<ReferenceCatalog, CatalogError> {
    let format = required(fields.format, "format")?;
    if format != FORMAT_NAME {
        return Err(CatalogError::InvalidFormat(format!(
            "unexpected format tag: {format}"
        )));
    }
    let version = required(fields.version, "version")?;
    if version as u64 != FORMAT_VERSION {
        return Err(CatalogError::InvalidFormat(format!(
            "unsupported version: {version}"
        )));
    }

    let names = required(fields.names, "names")?;
    let params = SoapParams::checked(
        required(fields.l_max, "l_max")?,
        required(fields.n_max, "n_max")?,
    )
    .map_err(|e| CatalogError::InvalidFormat(e.to_string()))?;

    let (rows, cols) = required(fields.shape, "shape")?;
    let bytes = required(fields.spectra, "spectra")?;
    let expected = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(8))
        .ok_or_else(|| {
            CatalogError::InvalidFormat(format!("a {rows}x{cols} table overflows"))
        })?;
    if bytes.len() != expected {
        return Err(CatalogError::InvalidFormat(format!(
            "spectra holds {} bytes, expected {expected} for a {rows}x{cols} table",
            bytes.len()
        )));
    }
    let values: Vec<f64> = bytes
        .chunks_exact(8)
        .map(|c| f64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect();
    let spectra = Array2::from_shape_vec((rows, cols), values)
        .map_err(|e| CatalogError::InvalidFormat(format!("spectra shape: {e}")))?;

    ReferenceCatalog::new(names, spectra, params)
}
