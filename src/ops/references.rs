//! Build a reference catalog from chosen `(frame, atom)` fingerprints.

use log::{debug, info, warn};
use ndarray::{s, Array2};

use super::normalize::normalize_vector;
use super::reconstruct::expand_vector;
use crate::adapters::source::FingerprintSource;
use crate::types::catalog::{CatalogError, ReferenceAddress, ReferenceCatalog};
use crate::types::fingerprint::{Layout, SoapParams};

/// Read one fingerprint per address, expand it to the full layout when stored
/// compressed, and optionally L2-normalize it.
///
/// The catalog keeps `addresses` order. Zero vectors are never normalized.
pub fn build_references<S>(
    addresses: &[ReferenceAddress],
    source: &mut S,
    params: SoapParams,
    normalize: bool,
) -> Result<ReferenceCatalog, CatalogError>
where
    S: FingerprintSource + ?Sized,
{
    let (frames, atoms, len) = source.shape();
    let layout = Layout::detect(len, params, source.species_blocks())?;

    // validate every address before reading anything
    if let Some(bad) = addresses
        .iter()
        .find(|addr| addr.frame >= frames || addr.atom >= atoms)
    {
        return Err(CatalogError::AddressOutOfRange {
            name: bad.name.clone(),
            frame: bad.frame,
            atom: bad.atom,
            frames,
            atoms,
        });
    }

    let mut spectra = Array2::zeros((addresses.len(), layout.full_len()));
    for (row, addr) in addresses.iter().enumerate() {
        let chunk = source.read_frames(addr.frame..addr.frame + 1)?;
        let stored = chunk.slice(s![0, addr.atom, ..]);
        let full = expand_vector(stored, params, source.species_blocks())?;

        let mut dst = spectra.row_mut(row);
        dst.assign(&full);
        if normalize && !normalize_vector(dst) {
            warn!(
                "reference {} (frame {}, atom {}) has zero norm; left unnormalized",
                addr.name, addr.frame, addr.atom
            );
        }
        debug!("reference {} taken from frame {}, atom {}", addr.name, addr.frame, addr.atom);
    }

    info!(
        "built {} references of length {} (compressed source: {})",
        addresses.len(),
        layout.full_len(),
        layout.is_compressed()
    );
    let names = addresses.iter().map(|a| a.name.clone()).collect();
    ReferenceCatalog::new(names, spectra, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::source::InMemorySource;
    use crate::ops::normalize::norm;
    use crate::types::fingerprint::SpeciesBlocks;
    use ndarray::Array3;

    fn source(params: SoapParams, frames: usize, atoms: usize) -> Array3<f64> {
        Array3::from_shape_fn((frames, atoms, params.upper_block_len()), |(f, a, k)| {
            (f * 7 + a * 3 + k) as f64 + 1.0
        })
    }

    #[test]
    fn test_build_expands_and_keeps_order() {
        let params = SoapParams::new(3, 4);
        let mut data = source(params, 4, 3);
        let addresses = vec![
            ReferenceAddress::new("b", 2, 1),
            ReferenceAddress::new("a", 0, 0),
        ];
        let catalog = build_references(&addresses, &mut data, params, false).unwrap();

        assert_eq!(catalog.names(), &["b", "a"]);
        assert_eq!(catalog.fingerprint_len(), params.full_block_len());
        let expected = expand_vector(data.slice(s![2, 1, ..]), params, None).unwrap();
        assert_eq!(catalog.spectra().row(0), expected);
    }

    #[test]
    fn test_build_normalized() {
        let params = SoapParams::new(1, 2);
        let mut data = source(params, 2, 2);
        data.slice_mut(s![1, 1, ..]).fill(0.0);
        let addresses = vec![
            ReferenceAddress::new("x", 0, 1),
            ReferenceAddress::new("zero", 1, 1),
        ];
        let catalog = build_references(&addresses, &mut data, params, true).unwrap();
        assert!((norm(catalog.spectra().row(0)) - 1.0).abs() < 1e-12);
        assert!(catalog.spectra().row(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_build_multi_species() {
        let params = SoapParams::new(1, 2);
        let blocks = SpeciesBlocks::from_species(&["H", "O"], params, true);
        let data = Array3::from_shape_fn((1, 2, blocks.compressed_len()), |(_, a, k)| (a + k) as f64);
        let mut src = InMemorySource::new(data).with_species_blocks(blocks.clone());
        let catalog =
            build_references(&[ReferenceAddress::new("w", 0, 1)], &mut src, params, false).unwrap();
        assert_eq!(catalog.fingerprint_len(), blocks.full_len(params));
    }

    #[test]
    fn test_address_out_of_range() {
        let params = SoapParams::new(0, 2);
        let mut data = source(params, 2, 2);
        let err = build_references(
            &[ReferenceAddress::new("ok", 0, 0), ReferenceAddress::new("far", 5, 0)],
            &mut data,
            params,
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::AddressOutOfRange { ref name, frame: 5, .. } if name == "far"
        ));
    }
}
