//! Reference catalog: named exemplar fingerprints sharing one `(l_max, n_max)`.

use std::collections::HashSet;

use ndarray::{concatenate, Array2, ArrayView1, ArrayView2, Axis};
use thiserror::Error;

use super::fingerprint::{FingerprintError, SoapParams};
use crate::adapters::trajectory::TrajectoryError;

/// Errors that can occur while building, merging or persisting catalogs.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(
        "incompatible catalogs: (l_max={l_max}, n_max={n_max}) cannot be merged with \
         (l_max={other_l_max}, n_max={other_n_max})"
    )]
    IncompatibleCatalogs {
        l_max: usize,
        n_max: usize,
        other_l_max: usize,
        other_n_max: usize,
    },
    #[error("no catalogs to merge")]
    NoCatalogs,
    #[error("duplicate reference name: {0}")]
    DuplicateName(String),
    #[error("{names} names given for {fingerprints} fingerprints")]
    NameCountMismatch { names: usize, fingerprints: usize },
    #[error("reference {name} points at frame {frame}, atom {atom}, outside a {frames}x{atoms} source")]
    AddressOutOfRange {
        name: String,
        frame: usize,
        atom: usize,
        frames: usize,
        atoms: usize,
    },
    #[error("invalid reference file: {0}")]
    InvalidFormat(String),
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Where to pick a reference fingerprint from: `name` taken at `(frame, atom)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceAddress {
    pub name: String,
    pub frame: usize,
    pub atom: usize,
}

impl ReferenceAddress {
    pub fn new(name: impl Into<String>, frame: usize, atom: usize) -> Self {
        Self {
            name: name.into(),
            frame,
            atom,
        }
    }
}

/// Ordered, immutable collection of named reference fingerprints.
///
/// Row `i` of `spectra` is the fingerprint of `names[i]`. Names are unique.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceCatalog {
    names: Vec<String>,
    spectra: Array2<f64>,
    params: SoapParams,
}

impl ReferenceCatalog {
    pub fn new(
        names: Vec<String>,
        spectra: Array2<f64>,
        params: SoapParams,
    ) -> Result<Self, CatalogError> {
        if names.len() != spectra.nrows() {
            return Err(CatalogError::NameCountMismatch {
                names: names.len(),
                fingerprints: spectra.nrows(),
            });
        }
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(CatalogError::DuplicateName(name.clone()));
            }
        }
        Ok(Self {
            names,
            spectra,
            params,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn spectra(&self) -> ArrayView2<'_, f64> {
        self.spectra.view()
    }

    pub fn params(&self) -> SoapParams {
        self.params
    }

    /// Length of every fingerprint in the catalog.
    pub fn fingerprint_len(&self) -> usize {
        self.spectra.ncols()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn get(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.position(name).map(|i| self.spectra.row(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ArrayView1<'_, f64>)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.spectra.axis_iter(Axis(0)))
    }

    pub fn into_parts(self) -> (Vec<String>, Array2<f64>, SoapParams) {
        (self.names, self.spectra, self.params)
    }
}

/// Concatenate catalogs in argument order.
///
/// All catalogs must share `l_max`, `n_max` and fingerprint length; nothing is
/// merged if any of them disagree.
pub fn merge_references<'a, I>(catalogs: I) -> Result<ReferenceCatalog, CatalogError>
where
    I: IntoIterator<Item = &'a ReferenceCatalog>,
{
    let catalogs: Vec<&ReferenceCatalog> = catalogs.into_iter().collect();
    let first = catalogs.first().ok_or(CatalogError::NoCatalogs)?;
    let params = first.params;

    for other in &catalogs[1..] {
        if other.params != params {
            return Err(CatalogError::IncompatibleCatalogs {
                l_max: params.l_max,
                n_max: params.n_max,
                other_l_max: other.params.l_max,
                other_n_max: other.params.n_max,
            });
        }
        if other.fingerprint_len() != first.fingerprint_len() {
            return Err(FingerprintError::LengthMismatch {
                expected: first.fingerprint_len(),
                found: other.fingerprint_len(),
            }
            .into());
        }
    }

    let names: Vec<String> = catalogs
        .iter()
        .flat_map(|c| c.names.iter().cloned())
        .collect();
    let views: Vec<ArrayView2<f64>> = catalogs.iter().map(|c| c.spectra.view()).collect();
    let spectra = concatenate(Axis(0), &views).map_err(|e| {
        CatalogError::InvalidFormat(format!("cannot concatenate fingerprints: {e}"))
    })?;

    ReferenceCatalog::new(names, spectra, params)
}
