//! Shared grid-schema types for the ocean current delivery pipelines.
//!
//! The catalog builder and the array transcoder never share runtime state,
//! but both speak in terms of the same coordinate axes. The catalog's claims
//! about chunk sizes are later checked against the store the transcoder
//! produced, so the shapes defined here are the common contract.

pub mod axis;
pub mod dimension;
pub mod error;
pub mod variable;

pub use axis::AxisRole;
pub use dimension::{regular_axis_size, DimensionDescriptor, DimensionExtent};
pub use error::{SchemaError, SchemaResult};
pub use variable::VariableDescriptor;
