//! The driving loop: one pass over the larger dataset in storage order.

use evmatch_core::error::Error as CoreError;
use evmatch_core::schema::{ChunkSchema, ScalarKind};
use evmatch_io::DatasetCursor;
use evmatch_mem::BufferManager;

use crate::error::Result;
use crate::index::EventIndex;
use crate::progress::ProgressReporter;
use crate::segmenter::OutputSegmenter;

/// Monotone counters observed during matching.
///
/// `processed` advances on every driving record, `matched` only on index
/// hits; both are plain reads with no effect on emission.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchStats {
    pub processed: u64,
    pub matched: u64,
}

pub struct RecordMatcher {
    driving: DatasetCursor,
    indexed: DatasetCursor,
    driving_prefix: String,
    indexed_prefix: String,
    index: EventIndex,
    buffers: BufferManager,
    /// Cursor generations at the last buffer resync, per side.
    driving_gen: u64,
    indexed_gen: u64,
    /// Field name/kind profiles from each side's first chunk. The merged
    /// schema is fixed at mirror time; a later chunk changing its field
    /// set is a fatal schema error, not a silent partial record.
    driving_fields: Vec<(String, ScalarKind)>,
    indexed_fields: Vec<(String, ScalarKind)>,
    stats: MatchStats,
}

fn field_profile(schema: &ChunkSchema) -> Vec<(String, ScalarKind)> {
    schema
        .fields
        .iter()
        .map(|f| (f.name.clone(), f.kind))
        .collect()
}

fn check_profile(
    expected: &[(String, ScalarKind)],
    schema: &ChunkSchema,
    path: &str,
) -> Result<()> {
    if field_profile(schema) != expected {
        return Err(CoreError::Schema(format!(
            "chunk '{path}' changed its field set mid-dataset"
        ))
        .into());
    }
    Ok(())
}

impl RecordMatcher {
    /// Both cursors must hold their first chunk and `buffers` must already
    /// be seeded by the schema mirror when the matcher is constructed.
    pub fn new(
        driving: DatasetCursor,
        indexed: DatasetCursor,
        driving_prefix: impl Into<String>,
        indexed_prefix: impl Into<String>,
        index: EventIndex,
        buffers: BufferManager,
    ) -> Result<Self> {
        let driving_gen = driving.generation();
        let indexed_gen = indexed.generation();
        let driving_fields = field_profile(driving.chunk()?.schema());
        let indexed_fields = field_profile(indexed.chunk()?.schema());
        Ok(Self {
            driving,
            indexed,
            driving_prefix: driving_prefix.into(),
            indexed_prefix: indexed_prefix.into(),
            index,
            buffers,
            driving_gen,
            indexed_gen,
            driving_fields,
            indexed_fields,
            stats: MatchStats::default(),
        })
    }

    pub fn stats(&self) -> MatchStats {
        self.stats
    }

    pub fn buffers(&self) -> &BufferManager {
        &self.buffers
    }

    /// Stream every driving record, emitting merged records on index hits.
    ///
    /// A lookup miss is expected and only moves the statistics. On a hit,
    /// any side whose chunk generation moved since its last resync gets a
    /// buffer resync before either record is materialized.
    pub fn run(
        &mut self,
        segmenter: &mut OutputSegmenter,
        progress: &ProgressReporter,
    ) -> Result<()> {
        let n_chunks = self.driving.dataset().n_chunks();
        for ci in 0..n_chunks {
            let n = self.driving.seek_chunk(ci)?.n_records() as usize;
            for row in 0..n {
                let key = self.driving.chunk()?.key(row)?;
                self.stats.processed += 1;

                if let Some(ordinal) = self.index.lookup(key) {
                    let indexed_row = self.indexed.seek_ordinal(ordinal)?;

                    if self.driving.generation() != self.driving_gen {
                        let chunk = self.driving.chunk()?;
                        check_profile(&self.driving_fields, chunk.schema(), chunk.path())?;
                        self.buffers
                            .resync(self.driving.chunk()?.schema(), &self.driving_prefix)?;
                        self.driving_gen = self.driving.generation();
                    }
                    if self.indexed.generation() != self.indexed_gen {
                        let chunk = self.indexed.chunk()?;
                        check_profile(&self.indexed_fields, chunk.schema(), chunk.path())?;
                        self.buffers
                            .resync(self.indexed.chunk()?.schema(), &self.indexed_prefix)?;
                        self.indexed_gen = self.indexed.generation();
                    }

                    self.driving
                        .chunk()?
                        .read_record_into(row, &self.driving_prefix, &mut self.buffers)?;
                    self.indexed.chunk()?.read_record_into(
                        indexed_row,
                        &self.indexed_prefix,
                        &mut self.buffers,
                    )?;

                    self.stats.matched += 1;
                    segmenter.append(&self.buffers)?;
                }

                progress.maybe_report(self.stats);
            }
        }
        Ok(())
    }
}
