//! Datasets as ordered chunk-file lists, and the cursor that walks them.
//!
//! The cursor's generation counter bumps on every chunk switch; upstream
//! code compares generations, never addresses, to decide when buffers need
//! a resync.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::Arc;

use tracing::debug;

use crate::chunk::LoadedChunk;
use crate::container;
use crate::error::{Error, Result};
use crate::storage::Storage;

/// Read a file list: one chunk path per line, blank lines skipped.
pub fn read_filelist(path: &str) -> Result<Vec<String>> {
    let f = File::open(path).map_err(|e| Error::Storage(format!("open filelist: {e}")))?;
    let mut paths = Vec::new();
    for line in BufReader::new(f).lines() {
        let line = line.map_err(|e| Error::Storage(format!("read filelist: {e}")))?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            paths.push(trimmed.to_string());
        }
    }
    if paths.is_empty() {
        return Err(Error::EmptyFileList(path.to_string()));
    }
    Ok(paths)
}

/// An ordered sequence of chunk containers with precomputed record counts.
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    paths: Vec<String>,
    /// Cumulative record count before each chunk (same length as `paths`).
    starts: Vec<u64>,
    total: u64,
}

impl Dataset {
    /// Open a dataset from a file list, counting records via chunk headers.
    pub fn open(storage: &dyn Storage, name: impl Into<String>, filelist: &str) -> Result<Self> {
        let name = name.into();
        let paths = read_filelist(filelist)?;
        let mut starts = Vec::with_capacity(paths.len());
        let mut total = 0u64;
        for path in &paths {
            let header = container::read_header(storage, path)?;
            starts.push(total);
            total += header.n_records;
        }
        debug!(dataset = %name, chunks = paths.len(), total, "opened dataset");
        Ok(Self {
            name,
            paths,
            starts,
            total,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn n_chunks(&self) -> usize {
        self.paths.len()
    }

    pub fn total_records(&self) -> u64 {
        self.total
    }

    pub fn chunk_path(&self, idx: usize) -> &str {
        &self.paths[idx]
    }

    /// Map a global record ordinal to (chunk index, row within chunk).
    pub fn locate(&self, ordinal: u64) -> Result<(usize, usize)> {
        if ordinal >= self.total {
            return Err(Error::OrdinalOutOfRange {
                ordinal,
                total: self.total,
            });
        }
        let idx = self.starts.partition_point(|&s| s <= ordinal) - 1;
        Ok((idx, (ordinal - self.starts[idx]) as usize))
    }
}

/// Walks one dataset chunk by chunk, tracking the current chunk generation.
pub struct DatasetCursor {
    storage: Arc<dyn Storage>,
    dataset: Dataset,
    chunk_idx: Option<usize>,
    chunk: Option<LoadedChunk>,
    generation: u64,
}

impl DatasetCursor {
    pub fn new(storage: Arc<dyn Storage>, dataset: Dataset) -> Self {
        Self {
            storage,
            dataset,
            chunk_idx: None,
            chunk: None,
            generation: 0,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Monotone counter; changes exactly when the loaded chunk changes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn chunk(&self) -> Result<&LoadedChunk> {
        self.chunk.as_ref().ok_or(Error::NoChunkLoaded)
    }

    /// Ensure chunk `idx` is loaded; bump the generation on a switch.
    pub fn seek_chunk(&mut self, idx: usize) -> Result<&LoadedChunk> {
        if self.chunk_idx != Some(idx) {
            let path = self.dataset.chunk_path(idx).to_string();
            debug!(dataset = self.dataset.name(), chunk = idx, %path, "loading chunk");
            let (schema, data) = container::read(self.storage.as_ref(), &path)?;
            self.chunk = Some(LoadedChunk::new(path, schema, data)?);
            self.chunk_idx = Some(idx);
            self.generation += 1;
        }
        self.chunk.as_ref().ok_or(Error::NoChunkLoaded)
    }

    /// Position on a global ordinal; returns the row within the loaded chunk.
    pub fn seek_ordinal(&mut self, ordinal: u64) -> Result<usize> {
        let (idx, row) = self.dataset.locate(ordinal)?;
        self.seek_chunk(idx)?;
        Ok(row)
    }
}
