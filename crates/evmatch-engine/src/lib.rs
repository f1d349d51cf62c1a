#![forbid(unsafe_code)]
//! evmatch-engine: the matching pipeline.
//!
//! [`runtime::Engine`] wires the phases together: open both datasets,
//! resolve which side gets indexed, build the key index, mirror both
//! schemas into one buffer set, stream the driving dataset through the
//! matcher, and segment the merged output.

pub mod error;
pub mod index;
pub mod matcher;
pub mod mirror;
pub mod progress;
pub mod runtime;
pub mod segmenter;

pub use error::{Error, Result};
pub use index::EventIndex;
pub use matcher::{MatchStats, RecordMatcher};
pub use progress::ProgressReporter;
pub use runtime::Engine;
pub use segmenter::OutputSegmenter;
