//! Lazy arrays: a source handle plus pending selection and reductions.
//!
//! Nothing is read until [`LazyArray::materialize`] is called. Selections
//! narrow the region that will be read; coarsening and precision changes
//! are applied to the values after the read.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::coarsen::{block_mean, coarsened_len};
use crate::config::Precision;
use crate::error::{Result, TranscodeError};

/// Random access to the decoded values of one array.
pub trait ArraySource: Send + Sync {
    /// Full extent of the array.
    fn shape(&self) -> &[u64];

    /// Read a hyper-rectangle as decoded `f64` values in C order.
    fn read_region(&self, start: &[u64], shape: &[u64]) -> Result<Vec<f64>>;
}

/// Array held entirely in memory.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    shape: Vec<u64>,
    values: Vec<f64>,
}

impl InMemorySource {
    pub fn new(shape: Vec<u64>, values: Vec<f64>) -> Result<Self> {
        let expected: u64 = shape.iter().product();
        if values.len() as u64 != expected {
            return Err(TranscodeError::zarr(format!(
                "{} values for shape {:?}",
                values.len(),
                shape
            )));
        }
        Ok(Self { shape, values })
    }

    /// One-dimensional array.
    pub fn vector(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len() as u64],
            values,
        }
    }
}

impl ArraySource for InMemorySource {
    fn shape(&self) -> &[u64] {
        &self.shape
    }

    fn read_region(&self, start: &[u64], shape: &[u64]) -> Result<Vec<f64>> {
        let ndim = self.shape.len();
        if start.len() != ndim || shape.len() != ndim {
            return Err(TranscodeError::zarr("region rank does not match array rank"));
        }
        for axis in 0..ndim {
            if start[axis] + shape[axis] > self.shape[axis] {
                return Err(TranscodeError::zarr(format!(
                    "region {:?}+{:?} outside array {:?}",
                    start, shape, self.shape
                )));
            }
        }

        let len: u64 = shape.iter().product();
        let mut out = Vec::with_capacity(len as usize);
        if len == 0 {
            return Ok(out);
        }

        let mut index = vec![0u64; ndim];
        for _ in 0..len {
            let mut flat = 0u64;
            for axis in 0..ndim {
                flat = flat * self.shape[axis] + start[axis] + index[axis];
            }
            out.push(self.values[flat as usize]);

            for axis in (0..ndim).rev() {
                index[axis] += 1;
                if index[axis] < shape[axis] {
                    break;
                }
                index[axis] = 0;
            }
        }
        Ok(out)
    }
}

/// A named array whose reads and reductions are deferred.
#[derive(Clone)]
pub struct LazyArray {
    name: String,
    dims: Vec<String>,
    source: Arc<dyn ArraySource>,
    selection: Vec<Range<u64>>,
    factors: Vec<usize>,
    precision: Precision,
    attributes: Map<String, Value>,
}

impl fmt::Debug for LazyArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyArray")
            .field("name", &self.name)
            .field("dims", &self.dims)
            .field("selection", &self.selection)
            .field("factors", &self.factors)
            .field("precision", &self.precision)
            .finish()
    }
}

/// Values of a lazy array after all pending work has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedArray {
    pub name: String,
    pub dims: Vec<String>,
    pub shape: Vec<u64>,
    pub values: Vec<f64>,
    pub precision: Precision,
    pub attributes: Map<String, Value>,
}

impl LazyArray {
    /// Wrap a source, selecting all of it at full precision.
    pub fn new(
        name: impl Into<String>,
        dims: Vec<String>,
        source: Arc<dyn ArraySource>,
        attributes: Map<String, Value>,
    ) -> Result<Self> {
        let name = name.into();
        if dims.len() != source.shape().len() {
            return Err(TranscodeError::zarr(format!(
                "'{}' has {} dimension names for {} axes",
                name,
                dims.len(),
                source.shape().len()
            )));
        }

        let selection = source.shape().iter().map(|&n| 0..n).collect();
        let factors = vec![1; dims.len()];
        Ok(Self {
            name,
            dims,
            source,
            selection,
            factors,
            precision: Precision::Float64,
            attributes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn has_dim(&self, dim: &str) -> bool {
        self.axis_of(dim).is_some()
    }

    fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    /// Extent after all pending selections and reductions.
    pub fn shape(&self) -> Vec<u64> {
        self.selection
            .iter()
            .zip(&self.factors)
            .map(|(range, &f)| coarsened_len((range.end - range.start) as usize, f) as u64)
            .collect()
    }

    /// Rename a dimension.
    pub fn rename_dim(mut self, from: &str, to: &str) -> Self {
        for dim in self.dims.iter_mut().filter(|d| *d == from) {
            *dim = to.to_string();
        }
        self
    }

    /// Restrict a dimension to `range`, relative to the current selection.
    ///
    /// Must happen before the dimension is coarsened.
    pub fn select(mut self, dim: &str, range: Range<u64>) -> Result<Self> {
        let axis = self
            .axis_of(dim)
            .ok_or_else(|| TranscodeError::zarr(format!("'{}' has no dimension '{}'", self.name, dim)))?;

        if self.factors[axis] != 1 {
            return Err(TranscodeError::zarr(format!(
                "cannot select on coarsened dimension '{}' of '{}'",
                dim, self.name
            )));
        }

        let current = self.selection[axis].clone();
        let len = current.end - current.start;
        if range.start >= range.end || range.end > len {
            return Err(TranscodeError::empty_selection(format!(
                "{:?} on '{}' of '{}' (length {})",
                range, dim, self.name, len
            )));
        }

        self.selection[axis] = current.start + range.start..current.start + range.end;
        Ok(self)
    }

    /// Average blocks of `factor` samples along a dimension.
    ///
    /// The trailing remainder is dropped from the selection, so the source
    /// is never read past the last full block.
    pub fn coarsen(mut self, dim: &str, factor: usize) -> Result<Self> {
        let axis = self
            .axis_of(dim)
            .ok_or_else(|| TranscodeError::zarr(format!("'{}' has no dimension '{}'", self.name, dim)))?;

        if self.factors[axis] != 1 {
            return Err(TranscodeError::zarr(format!(
                "dimension '{}' of '{}' is already coarsened",
                dim, self.name
            )));
        }

        let factor = factor.max(1);
        let current = self.selection[axis].clone();
        let len = (current.end - current.start) as usize;
        let kept = coarsened_len(len, factor);
        if kept == 0 {
            return Err(TranscodeError::empty_selection(format!(
                "coarsening '{}' of '{}' by {} leaves no samples (length {})",
                dim, self.name, factor, len
            )));
        }

        self.selection[axis] = current.start..current.start + (kept * factor) as u64;
        self.factors[axis] = factor;
        Ok(self)
    }

    /// Round values to `precision` on materialization.
    pub fn cast(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// Read the selected region and apply pending reductions.
    ///
    /// Averaging is done in `f64`; rounding to the target precision comes last.
    pub fn materialize(&self) -> Result<MaterializedArray> {
        let start: Vec<u64> = self.selection.iter().map(|r| r.start).collect();
        let extent: Vec<u64> = self.selection.iter().map(|r| r.end - r.start).collect();
        let raw = self.source.read_region(&start, &extent)?;

        let extent_usize: Vec<usize> = extent.iter().map(|&n| n as usize).collect();
        let (mut values, shape) = block_mean(&raw, &extent_usize, &self.factors);

        if self.precision != Precision::Float64 {
            for value in values.iter_mut() {
                *value = self.precision.round(*value);
            }
        }

        Ok(MaterializedArray {
            name: self.name.clone(),
            dims: self.dims.clone(),
            shape: shape.into_iter().map(|n| n as u64).collect(),
            values,
            precision: self.precision,
            attributes: self.attributes.clone(),
        })
    }
}
