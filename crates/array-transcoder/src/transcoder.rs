//! The transcode pipeline end to end.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use crate::cf::decode_time;
use crate::config::TranscodeSpec;
use crate::error::Result;
use crate::lock::DestinationLock;
use crate::source::{ArrayProvider, OpenRequest};
use crate::writer::{ChunkCodec, StoreWriter, StoredArray, ZarrV2Store};

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct TranscodeReport {
    pub dataset_id: String,
    pub destination: PathBuf,
    /// Selected time as stored in the source.
    pub time_value: f64,
    pub time_units: Option<String>,
    /// Selected time decoded from its CF units, when they are understood.
    pub time: Option<DateTime<Utc>>,
    /// Output length of each coordinate axis.
    pub sizes: BTreeMap<String, u64>,
    pub total_bytes: u64,
    pub arrays: BTreeMap<String, StoredArray>,
}

/// Runs transcodes against one array provider.
pub struct Transcoder {
    provider: Arc<dyn ArrayProvider>,
}

impl Transcoder {
    pub fn new(provider: Arc<dyn ArrayProvider>) -> Self {
        Self { provider }
    }

    /// Produce a verified local store for `spec`.
    ///
    /// The spec is validated before the provider is contacted. The
    /// destination is locked from the wipe until verification finishes.
    #[instrument(skip(self, spec), fields(dataset_id = %spec.dataset_id, destination = %spec.destination.display()))]
    pub async fn run(&self, spec: &TranscodeSpec) -> Result<TranscodeReport> {
        spec.validate()?;

        let request = OpenRequest::from(spec);
        let opened = self.provider.open_dataset(&request).await?;
        let downcast = opened
            .select_latest_time()?
            .coarsen(spec.coarsening_factor)?
            .downcast(spec.precision);
        let sizes = downcast.dataset().sizes();

        let _lock = DestinationLock::acquire(&spec.destination)?;
        let store = ZarrV2Store::new(&spec.destination);
        store.reset()?;

        let codec = ChunkCodec::new(spec.compression, spec.compression_level);
        let written = downcast.rechunk(&spec.chunk_sizes)?.encode(codec).write(&store)?;
        let local = written.verify(&store, &spec.expected_arrays(), spec.max_store_bytes)?;

        let time = written.time();
        let report = TranscodeReport {
            dataset_id: spec.dataset_id.clone(),
            destination: local.path,
            time_value: time.value,
            time_units: time.units.clone(),
            time: time
                .units
                .as_deref()
                .and_then(|units| decode_time(time.value, units)),
            sizes,
            total_bytes: local.total_bytes,
            arrays: local.arrays,
        };

        info!(
            time = ?report.time,
            sizes = ?report.sizes,
            total_bytes = report.total_bytes,
            compression = %spec.compression,
            "Transcode complete"
        );
        Ok(report)
    }
}
