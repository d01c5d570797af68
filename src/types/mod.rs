//! Core data types for the soapify crate.

pub mod catalog;
pub mod classification;
pub mod event;
pub mod fingerprint;

// Re-export commonly used items
pub use catalog::{merge_references, CatalogError, ReferenceAddress, ReferenceCatalog};
pub use classification::{Classification, ClassificationError};
pub use event::{Event, EventHistory};
pub use fingerprint::{FingerprintError, Layout, SoapParams, SpeciesBlock, SpeciesBlocks};
