#![forbid(unsafe_code)]
//! evmatch-mem: typed field buffers and the buffer manager.
//!
//! One contiguously allocated buffer exists per merged field, owned
//! exclusively by the [`BufferManager`]. The chunk reader writes records
//! into these buffers and the segment writer reads them back out; because
//! both go through the manager, replacing a buffer on growth can never
//! leave either side pointing at stale memory.
//!
//! No IO lives here. Container/segment persistence is `evmatch-io`.

pub mod buffers;
pub mod error;
pub mod scalar;
pub mod tracking;

pub use buffers::{BufferManager, FieldBuffer};
pub use scalar::ScalarVec;
pub use tracking::AllocTracker;
