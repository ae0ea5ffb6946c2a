//! Typed pipeline stages.
//!
//! Each transition consumes the previous stage, so steps cannot be skipped
//! or reordered:
//!
//! ```text
//! OpenedDataset -> TimeSelected -> Coarsened -> Downcast
//!     -> Rechunked -> Encoded -> Written -> LocalStore
//! ```
//!
//! Everything up to [`Downcast`] is lazy. [`Downcast::rechunk`] performs all
//! source reads.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use ocean_common::AxisRole;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::{ChunkSizes, DepthRange, Precision};
use crate::error::{Result, TranscodeError};
use crate::lazy::{InMemorySource, LazyArray, MaterializedArray};
use crate::source::OpenRequest;
use crate::verify::{verify_store, LocalStore};
use crate::writer::{ArrayKind, ChunkCodec, EncodedArray, StoreReader, StoreWriter};

/// A coordinate axis held in memory.
#[derive(Debug, Clone)]
pub struct Coordinate {
    role: AxisRole,
    array: LazyArray,
}

impl Coordinate {
    /// Coordinate named and dimensioned by the role's canonical name.
    pub fn new(role: AxisRole, values: Vec<f64>, attributes: Map<String, Value>) -> Result<Self> {
        let name = role.canonical_name();
        let array = LazyArray::new(
            name,
            vec![name.to_string()],
            Arc::new(InMemorySource::vector(values)),
            attributes,
        )?;
        Ok(Self { role, array })
    }

    pub fn role(&self) -> AxisRole {
        self.role
    }

    pub fn array(&self) -> &LazyArray {
        &self.array
    }

    pub fn len(&self) -> u64 {
        self.array.shape().first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values after pending selection and averaging.
    pub fn values(&self) -> Result<Vec<f64>> {
        Ok(self.array.materialize()?.values)
    }
}

/// Coordinates, data variables and group attributes.
#[derive(Debug, Clone)]
pub struct Dataset {
    coordinates: Vec<Coordinate>,
    variables: Vec<LazyArray>,
    attributes: Map<String, Value>,
}

impl Dataset {
    pub fn new(
        coordinates: Vec<Coordinate>,
        variables: Vec<LazyArray>,
        attributes: Map<String, Value>,
    ) -> Self {
        Self {
            coordinates,
            variables,
            attributes,
        }
    }

    pub fn coordinate(&self, role: AxisRole) -> Result<&Coordinate> {
        self.coordinates
            .iter()
            .find(|c| c.role == role)
            .ok_or(TranscodeError::MissingAxis { axis: role })
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    pub fn variables(&self) -> &[LazyArray] {
        &self.variables
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Current length of every coordinate axis.
    pub fn sizes(&self) -> BTreeMap<String, u64> {
        self.coordinates
            .iter()
            .map(|c| (c.role.canonical_name().to_string(), c.len()))
            .collect()
    }

    /// Apply `f` to the coordinate of `role` and to every variable that
    /// spans it.
    fn transform_axis<F>(self, role: AxisRole, f: F) -> Result<Self>
    where
        F: Fn(LazyArray, &str) -> Result<LazyArray>,
    {
        let dim = role.canonical_name();
        let coordinates = self
            .coordinates
            .into_iter()
            .map(|c| {
                if c.role == role {
                    Ok(Coordinate {
                        role,
                        array: f(c.array, dim)?,
                    })
                } else {
                    Ok(c)
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let variables = self
            .variables
            .into_iter()
            .map(|v| if v.has_dim(dim) { f(v, dim) } else { Ok(v) })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            coordinates,
            variables,
            attributes: self.attributes,
        })
    }

    pub fn select(self, role: AxisRole, range: Range<u64>) -> Result<Self> {
        self.transform_axis(role, |array, dim| array.select(dim, range.clone()))
    }

    pub fn coarsen(self, role: AxisRole, factor: usize) -> Result<Self> {
        self.transform_axis(role, |array, dim| array.coarsen(dim, factor))
    }

    /// Cast data variables and every coordinate except time.
    fn cast(self, precision: Precision) -> Self {
        let coordinates = self
            .coordinates
            .into_iter()
            .map(|c| match c.role {
                AxisRole::Time => c,
                role => Coordinate {
                    role,
                    array: c.array.cast(precision),
                },
            })
            .collect();
        let variables = self
            .variables
            .into_iter()
            .map(|v| v.cast(precision))
            .collect();

        Self {
            coordinates,
            variables,
            attributes: self.attributes,
        }
    }
}

/// Index range of the depth levels inside `range`, from the first match
/// to the last.
pub fn depth_band(depths: &[f64], range: &DepthRange) -> Option<Range<u64>> {
    let first = depths.iter().position(|&d| range.contains(d))?;
    let last = depths.iter().rposition(|&d| range.contains(d))?;
    Some(first as u64..last as u64 + 1)
}

/// Index of the greatest time value. NaNs are ignored; ties keep the first.
pub fn latest_index(times: &[f64]) -> Option<usize> {
    times
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.is_nan())
        .rev()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}

/// Dataset as opened, restricted to the requested depth band.
#[derive(Debug, Clone)]
pub struct OpenedDataset {
    dataset: Dataset,
}

impl OpenedDataset {
    /// Check the dataset against the request and apply the depth band.
    pub fn open(dataset: Dataset, request: &OpenRequest) -> Result<Self> {
        for axis in AxisRole::ALL {
            dataset.coordinate(axis)?;
        }
        for name in &request.variables {
            if !dataset.variables.iter().any(|v| v.name() == name) {
                return Err(TranscodeError::MissingVariable(name.clone()));
            }
        }

        let depths = dataset.coordinate(AxisRole::Depth)?.values()?;
        let band = depth_band(&depths, &request.depth_range).ok_or_else(|| {
            TranscodeError::empty_selection(format!(
                "no depth level within [{}, {}] m",
                request.depth_range.min, request.depth_range.max
            ))
        })?;
        debug!(levels = band.end - band.start, first = band.start, "Selected depth band");

        let dataset = dataset.select(AxisRole::Depth, band)?;
        Ok(Self { dataset })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Keep only the most recent time step.
    pub fn select_latest_time(self) -> Result<TimeSelected> {
        let time = self.dataset.coordinate(AxisRole::Time)?;
        let units = time
            .array()
            .attributes()
            .get("units")
            .and_then(|u| u.as_str())
            .map(str::to_string);
        let values = time.values()?;
        let index = latest_index(&values)
            .ok_or_else(|| TranscodeError::empty_selection("time axis has no valid values"))?;
        let time_value = values[index];
        info!(time_index = index, time_value, steps = values.len(), "Selected latest time");

        let dataset = self
            .dataset
            .select(AxisRole::Time, index as u64..index as u64 + 1)?;
        Ok(TimeSelected {
            dataset,
            time: TimeStamp {
                value: time_value,
                units,
            },
        })
    }
}

/// The selected time step as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeStamp {
    pub value: f64,
    pub units: Option<String>,
}

/// Single time step selected.
#[derive(Debug, Clone)]
pub struct TimeSelected {
    dataset: Dataset,
    time: TimeStamp,
}

impl TimeSelected {
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn time(&self) -> &TimeStamp {
        &self.time
    }

    /// Block-average latitude and longitude by `factor`.
    pub fn coarsen(self, factor: usize) -> Result<Coarsened> {
        let dataset = self
            .dataset
            .coarsen(AxisRole::Latitude, factor)?
            .coarsen(AxisRole::Longitude, factor)?;
        info!(factor, sizes = ?dataset.sizes(), "Coarsened horizontal grid");
        Ok(Coarsened {
            dataset,
            time: self.time,
        })
    }
}

/// Horizontal grid coarsened.
#[derive(Debug, Clone)]
pub struct Coarsened {
    dataset: Dataset,
    time: TimeStamp,
}

impl Coarsened {
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Reduce precision of data variables and non-time coordinates.
    pub fn downcast(self, precision: Precision) -> Downcast {
        Downcast {
            dataset: self.dataset.cast(precision),
            time: self.time,
        }
    }
}

/// Precision reduced; still lazy.
#[derive(Debug, Clone)]
pub struct Downcast {
    dataset: Dataset,
    time: TimeStamp,
}

/// A materialized array with its output chunk shape.
#[derive(Debug, Clone)]
pub struct PlannedArray {
    pub array: MaterializedArray,
    pub chunks: Vec<u64>,
    pub kind: ArrayKind,
}

/// Chunk shape for an array: the target chunk of each dimension's role,
/// clipped to the extent. Unknown dimensions keep their full extent.
pub fn chunk_shape(dims: &[String], shape: &[u64], targets: &ChunkSizes) -> Vec<u64> {
    dims.iter()
        .zip(shape)
        .map(|(dim, &extent)| {
            let target = AxisRole::from_dimension_name(dim)
                .map(|role| targets.for_axis(role))
                .unwrap_or(extent);
            target.min(extent).max(1)
        })
        .collect()
}

impl Downcast {
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Assign output chunks and read everything into memory.
    pub fn rechunk(self, targets: &ChunkSizes) -> Result<Rechunked> {
        let mut arrays = Vec::with_capacity(self.dataset.coordinates.len() + self.dataset.variables.len());

        for coordinate in &self.dataset.coordinates {
            let array = coordinate.array.materialize()?;
            let chunks = chunk_shape(&array.dims, &array.shape, targets);
            arrays.push(PlannedArray {
                array,
                chunks,
                kind: ArrayKind::Coordinate(coordinate.role),
            });
        }

        for variable in &self.dataset.variables {
            let array = variable.materialize()?;
            let chunks = chunk_shape(&array.dims, &array.shape, targets);
            debug!(
                variable = %array.name,
                shape = ?array.shape,
                chunks = ?chunks,
                "Materialized variable"
            );
            arrays.push(PlannedArray {
                array,
                chunks,
                kind: ArrayKind::Variable,
            });
        }

        Ok(Rechunked {
            arrays,
            attributes: self.dataset.attributes,
            time: self.time,
        })
    }
}

/// All arrays in memory with output chunk shapes.
#[derive(Debug, Clone)]
pub struct Rechunked {
    arrays: Vec<PlannedArray>,
    attributes: Map<String, Value>,
    time: TimeStamp,
}

impl Rechunked {
    pub fn arrays(&self) -> &[PlannedArray] {
        &self.arrays
    }

    /// Attach the compressor to every array.
    pub fn encode(self, codec: ChunkCodec) -> Encoded {
        let arrays = self
            .arrays
            .into_iter()
            .map(|planned| EncodedArray {
                array: planned.array,
                chunks: planned.chunks,
                codec,
                kind: planned.kind,
            })
            .collect();

        Encoded {
            arrays,
            attributes: self.attributes,
            time: self.time,
        }
    }
}

/// Ready to write.
#[derive(Debug, Clone)]
pub struct Encoded {
    arrays: Vec<EncodedArray>,
    attributes: Map<String, Value>,
    time: TimeStamp,
}

impl Encoded {
    pub fn arrays(&self) -> &[EncodedArray] {
        &self.arrays
    }

    pub fn write<W: StoreWriter + ?Sized>(self, writer: &W) -> Result<Written> {
        let bytes_written = writer.write(&self.arrays, &self.attributes)?;

        let arrays = self
            .arrays
            .iter()
            .map(|a| (a.name().to_string(), (a.array.shape.clone(), a.chunks.clone())))
            .collect();

        Ok(Written {
            arrays,
            bytes_written,
            time: self.time,
        })
    }
}

/// Written to disk, not yet verified.
#[derive(Debug, Clone)]
pub struct Written {
    /// Shape and chunk shape of every written array.
    arrays: BTreeMap<String, (Vec<u64>, Vec<u64>)>,
    bytes_written: u64,
    time: TimeStamp,
}

impl Written {
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn time(&self) -> &TimeStamp {
        &self.time
    }

    /// Reopen the store and compare it with what was encoded.
    pub fn verify<R: StoreReader + ?Sized>(
        &self,
        reader: &R,
        expected_names: &[String],
        max_store_bytes: Option<u64>,
    ) -> Result<LocalStore> {
        let snapshot = reader.open()?;
        verify_store(snapshot, expected_names, &self.arrays, max_store_bytes)
    }
}
