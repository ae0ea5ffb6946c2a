//! Array transcoder.
//!
//! Opens a remote chunked-array dataset, keeps the latest time step and a
//! shallow depth band, block-averages the horizontal grid, reduces
//! precision, and writes a small Zarr v2 store with consolidated metadata
//! that a browser can fetch chunk by chunk.
//!
//! ```text
//! ArrayProvider::open_dataset ──► OpenedDataset (depth band applied)
//!        │
//!        ├─► select_latest_time ──► coarsen(f) ──► downcast(f32)
//!        │
//!        ├─► DestinationLock + wipe
//!        │
//!        └─► rechunk (reads) ──► encode ──► write ──► verify ──► LocalStore
//! ```
//!
//! Everything before `rechunk` is lazy: data variables are source handles
//! with pending selections, so only the region that survives selection is
//! ever read.

pub mod cf;
pub mod coarsen;
pub mod config;
pub mod error;
pub mod lazy;
pub mod lock;
pub mod metadata;
pub mod source;
pub mod stages;
pub mod transcoder;
pub mod verify;
pub mod writer;

pub use config::{ChunkSizes, Compression, DepthRange, Precision, TranscodeSpec, DEFAULT_DATASET_ID};
pub use error::{Result, TranscodeError};
pub use lazy::{ArraySource, InMemorySource, LazyArray, MaterializedArray};
pub use lock::DestinationLock;
pub use source::{ArrayProvider, FilesystemArrayProvider, HttpArrayProvider, OpenRequest};
pub use stages::{Coordinate, Dataset, OpenedDataset};
pub use transcoder::{TranscodeReport, Transcoder};
pub use verify::LocalStore;
pub use writer::{ChunkCodec, StoreReader, StoreWriter, ZarrV2Store};
