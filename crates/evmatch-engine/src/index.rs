//! Key index over the smaller dataset.

use std::collections::HashMap;

use tracing::debug;

use evmatch_core::key::{CompositeKey, EVENT_FIELD, RUN_FIELD};
use evmatch_io::DatasetCursor;

use crate::error::Result;

/// Immutable map from composite key to global record ordinal.
///
/// Built by one forward scan before matching starts; lookups are O(1).
/// Duplicate keys in the scanned dataset leave the last occurrence in the
/// map; which match a duplicate resolves to is not part of the contract.
pub struct EventIndex {
    map: HashMap<CompositeKey, u64>,
}

impl EventIndex {
    /// Scan every chunk of `cursor`'s dataset and index its keys.
    ///
    /// Fails fatally if `run`/`event` are missing from any chunk schema.
    pub fn build(cursor: &mut DatasetCursor) -> Result<Self> {
        let total = cursor.dataset().total_records();
        let n_chunks = cursor.dataset().n_chunks();
        let dataset_name = cursor.dataset().name().to_string();

        let mut map = HashMap::with_capacity(total as usize);
        let mut base = 0u64;
        for ci in 0..n_chunks {
            let chunk = cursor.seek_chunk(ci)?;
            chunk
                .schema()
                .require_fields(&dataset_name, &[RUN_FIELD, EVENT_FIELD])?;
            let n = chunk.n_records();
            for row in 0..n as usize {
                map.insert(chunk.key(row)?, base + row as u64);
            }
            base += n;
        }
        debug!(dataset = %dataset_name, entries = map.len(), "built key index");
        Ok(Self { map })
    }

    pub fn lookup(&self, key: CompositeKey) -> Option<u64> {
        self.map.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
