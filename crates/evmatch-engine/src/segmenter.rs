//! Size-bounded output segments over the merged schema.
//!
//! One segment is mutable at a time. A record is appended first and the
//! bound checked after, so a segment may exceed the configured maximum by
//! at most the record that triggered rotation. Segment 1 is created lazily
//! on the first match; indices increase strictly and finalized containers
//! are never reopened.

use std::sync::Arc;

use tracing::info;

use evmatch_io::chunk::{ChunkData, Column};
use evmatch_io::container::{self, CONTAINER_EXT};
use evmatch_io::Storage;
use evmatch_mem::{BufferManager, ScalarVec};

use crate::error::Result;
use crate::mirror::merged_schema;

struct ActiveSegment {
    index: u32,
    columns: Vec<Column>,
    n_records: u64,
    est_bytes: u64,
}

pub struct OutputSegmenter {
    storage: Arc<dyn Storage>,
    out_dir: String,
    out_prefix: String,
    max_bytes: u64,
    /// Fixed cost of an empty container, measured once by a dry-run encode.
    header_cost: Option<u64>,
    active: Option<ActiveSegment>,
    next_index: u32,
    segments_written: u32,
    records_written: u64,
}

impl OutputSegmenter {
    pub fn new(
        storage: Arc<dyn Storage>,
        out_dir: impl Into<String>,
        out_prefix: impl Into<String>,
        max_bytes: u64,
    ) -> Self {
        Self {
            storage,
            out_dir: out_dir.into(),
            out_prefix: out_prefix.into(),
            max_bytes,
            header_cost: None,
            active: None,
            next_index: 1,
            segments_written: 0,
            records_written: 0,
        }
    }

    pub fn segments_written(&self) -> u32 {
        self.segments_written
    }

    /// Records across all segments, finalized and active.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Append the record currently materialized in `buffers`.
    pub fn append(&mut self, buffers: &BufferManager) -> Result<()> {
        let mut active = match self.active.take() {
            Some(a) => a,
            None => self.new_segment(buffers)?,
        };

        let mut marginal = 0u64;
        for column in &mut active.columns {
            let fb = buffers.field(&column.name)?;
            let count = match fb.counter.as_deref() {
                Some(counter) => buffers.counter_value(counter)?,
                None => 1,
            };
            column.data.extend_from(&fb.buf, 0..count)?;
            marginal += (fb.kind.elem_size() * count) as u64;
        }
        active.n_records += 1;
        active.est_bytes += marginal;
        self.records_written += 1;

        // Check after append: the triggering record stays in this segment.
        if active.est_bytes > self.max_bytes {
            self.finalize(active, buffers)?;
        } else {
            self.active = Some(active);
        }
        Ok(())
    }

    /// Finalize the active segment if it holds any records.
    pub fn finish(&mut self, buffers: &BufferManager) -> Result<()> {
        if let Some(active) = self.active.take() {
            if active.n_records > 0 {
                self.finalize(active, buffers)?;
            }
        }
        Ok(())
    }

    fn new_segment(&mut self, buffers: &BufferManager) -> Result<ActiveSegment> {
        let schema = merged_schema(buffers)?;
        let header_cost = match self.header_cost {
            Some(c) => c,
            None => {
                let empty = ChunkData {
                    n_records: 0,
                    columns: Vec::new(),
                };
                let cost = container::encode(&schema, &empty)?.len() as u64;
                self.header_cost = Some(cost);
                cost
            }
        };
        let mut columns = Vec::with_capacity(buffers.len());
        for name in buffers.names() {
            let fb = buffers.field(name)?;
            columns.push(Column {
                name: name.to_string(),
                data: ScalarVec::empty(fb.kind),
            });
        }
        let segment = ActiveSegment {
            index: self.next_index,
            columns,
            n_records: 0,
            est_bytes: header_cost,
        };
        self.next_index += 1;
        Ok(segment)
    }

    fn finalize(&mut self, active: ActiveSegment, buffers: &BufferManager) -> Result<()> {
        let path = format!(
            "{}/{}_{}.{}",
            self.out_dir, self.out_prefix, active.index, CONTAINER_EXT
        );
        let schema = merged_schema(buffers)?;
        let data = ChunkData {
            n_records: active.n_records,
            columns: active.columns,
        };
        let bytes = container::write(self.storage.as_ref(), &path, &schema, &data)?;
        info!(
            segment = active.index,
            records = active.n_records,
            estimated = active.est_bytes,
            written = bytes,
            %path,
            "finalized segment"
        );
        self.segments_written += 1;
        Ok(())
    }
}
