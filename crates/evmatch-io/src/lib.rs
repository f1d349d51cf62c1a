#![forbid(unsafe_code)]
//! evmatch-io: the chunked columnar storage backend.
//!
//! Both input chunks and output segments are the same self-contained `.evc`
//! container: a fixed binary header, schema JSON, columnar payload JSON, and
//! a blake3 trailer. Datasets are ordered lists of chunk paths; a cursor
//! loads one chunk at a time and bumps a generation counter on every switch,
//! which is what triggers buffer resync upstream.

pub mod chunk;
pub mod container;
pub mod dataset;
pub mod error;
pub mod storage;

pub use chunk::{Column, ChunkData, LoadedChunk};
pub use container::{ContainerHeader, CONTAINER_EXT};
pub use dataset::{read_filelist, Dataset, DatasetCursor};
pub use error::{Error, Result};
pub use storage::{FsStorage, Storage};
