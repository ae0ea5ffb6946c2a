//! Schema catalog builder.
//!
//! For each configured target dataset this crate queries a remote metadata
//! provider, selects the preferred delivery variant ("service"), and emits a
//! normalized descriptor: identifier, label, store URL, variables and the
//! dimension schema of the grid.
//!
//! ```text
//! TargetSpec ──► MetadataProvider::describe(dataset_id)
//!                      │
//!                      ├─► SelectionPolicy (product → dataset → version → part)
//!                      │
//!                      ├─► service by name, must be "zarr"
//!                      │
//!                      └─► CatalogEntry { variables, dimensions }
//! ```
//!
//! Lookup misses yield `None` and provider faults are logged per target, so a
//! catalog build always completes.

pub mod builder;
pub mod catalog;
pub mod describe;
pub mod error;
pub mod provider;
pub mod selection;
pub mod target;

pub use builder::{CatalogBuilder, ResolvedService};
pub use catalog::{Catalog, CatalogEntry};
pub use describe::{
    DescribeResponse, ProviderCoordinate, ProviderDataset, ProviderPart, ProviderProduct,
    ProviderService, ProviderVariable, ProviderVersion,
};
pub use error::{CatalogError, Result};
pub use provider::{DescribeDocumentProvider, DocumentSource, MetadataProvider};
pub use selection::{Selection, SelectionPolicy};
pub use target::TargetSpec;

/// Storage format tag of the chunked-array delivery variants this crate accepts.
pub const ZARR_FORMAT: &str = "zarr";
