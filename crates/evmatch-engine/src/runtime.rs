//! End-to-end orchestration of one matching run.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tracing::info;

use evmatch_core::config::MatchConfig;
use evmatch_core::key::{EVENT_FIELD, RUN_FIELD};
use evmatch_core::summary::RunSummary;
use evmatch_io::{Dataset, DatasetCursor, FsStorage, Storage};
use evmatch_mem::BufferManager;

use crate::error::{Error, Result};
use crate::index::EventIndex;
use crate::matcher::RecordMatcher;
use crate::mirror::mirror_into;
use crate::progress::ProgressReporter;
use crate::segmenter::OutputSegmenter;

/// One matching run: open both datasets, resolve roles, build the index,
/// stream the driving dataset, write segments and a run summary.
pub struct Engine {
    cfg: MatchConfig,
    storage: Arc<dyn Storage>,
}

impl Engine {
    pub fn new(cfg: MatchConfig) -> Self {
        Self {
            cfg,
            storage: Arc::new(FsStorage::new()),
        }
    }

    pub fn with_storage(cfg: MatchConfig, storage: Arc<dyn Storage>) -> Self {
        Self { cfg, storage }
    }

    pub fn run(&self) -> Result<RunSummary> {
        let started_ms = now_ms();
        let cfg = &self.cfg;

        let a = Dataset::open(self.storage.as_ref(), "A", &cfg.filelist_a)?;
        let b = Dataset::open(self.storage.as_ref(), "B", &cfg.filelist_b)?;
        let mut summary = RunSummary::new(a.total_records(), b.total_records(), started_ms);

        // The smaller dataset is indexed, the larger one drives; its prefix
        // travels with it. A tie indexes A.
        let a_indexed = a.total_records() <= b.total_records();
        let (indexed_ds, driving_ds, indexed_prefix, driving_prefix) = if a_indexed {
            (a, b, cfg.prefix_a.clone(), cfg.prefix_b.clone())
        } else {
            (b, a, cfg.prefix_b.clone(), cfg.prefix_a.clone())
        };
        if cfg.verbose >= 1 {
            info!(
                indexed = indexed_ds.name(),
                indexed_records = indexed_ds.total_records(),
                driving = driving_ds.name(),
                driving_records = driving_ds.total_records(),
                "resolved dataset roles"
            );
        }

        let mut indexed = DatasetCursor::new(Arc::clone(&self.storage), indexed_ds);
        let mut driving = DatasetCursor::new(Arc::clone(&self.storage), driving_ds);

        let index_started = Instant::now();
        let index = EventIndex::build(&mut indexed)?;
        if cfg.verbose >= 1 {
            info!(
                entries = index.len(),
                elapsed_ms = index_started.elapsed().as_millis() as u64,
                "key index ready"
            );
        }

        // Seed the merged buffers from both first chunks, driving side first.
        // The index build already checked the indexed side's key fields.
        let driving_name = driving.dataset().name().to_string();
        driving
            .seek_chunk(0)?
            .schema()
            .require_fields(&driving_name, &[RUN_FIELD, EVENT_FIELD])?;
        indexed.seek_chunk(0)?;
        let mut buffers = BufferManager::new();
        mirror_into(driving.chunk()?.schema(), &driving_prefix, &mut buffers)?;
        mirror_into(indexed.chunk()?.schema(), &indexed_prefix, &mut buffers)?;
        if cfg.verbose >= 2 {
            info!(fields = buffers.len(), "mirrored merged schema");
        }

        let mut segmenter = OutputSegmenter::new(
            Arc::clone(&self.storage),
            cfg.out_dir_normalized(),
            cfg.out_prefix.clone(),
            cfg.max_segment_bytes,
        );
        let progress = ProgressReporter::new(
            cfg.verbose >= 1,
            summary.total_a.max(summary.total_b),
            summary.total_a,
            summary.total_b,
            cfg.print_every_percent,
        );

        let mut matcher = RecordMatcher::new(
            driving,
            indexed,
            driving_prefix,
            indexed_prefix,
            index,
            buffers,
        )?;
        matcher.run(&mut segmenter, &progress)?;
        segmenter.finish(matcher.buffers())?;

        if cfg.verbose >= 3 {
            let tracker = matcher.buffers().tracker();
            info!(
                live_bytes = tracker.live(),
                peak_bytes = tracker.peak(),
                reallocs = tracker.reallocs(),
                "buffer allocation stats"
            );
        }

        let stats = matcher.stats();
        summary.processed = stats.processed;
        summary.matched = stats.matched;
        summary.segments_written = segmenter.segments_written();
        summary.finished_ms = now_ms();
        self.write_summary(&summary)?;

        if cfg.verbose >= 1 {
            info!(
                processed = summary.processed,
                matched = summary.matched,
                match_a = format_args!("{:.3}%", summary.match_rate_a()),
                match_b = format_args!("{:.3}%", summary.match_rate_b()),
                segments = summary.segments_written,
                elapsed_ms = summary.finished_ms.saturating_sub(summary.started_ms),
                "run complete"
            );
        }
        Ok(summary)
    }

    fn write_summary(&self, summary: &RunSummary) -> Result<()> {
        let path = format!(
            "{}/{}_summary.json",
            self.cfg.out_dir_normalized(),
            self.cfg.out_prefix
        );
        let bytes = serde_json::to_vec_pretty(summary)?;
        self.storage
            .write(&path, &bytes)
            .map_err(|e| Error::Summary(format!("write {path}: {e}")))?;
        Ok(())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
