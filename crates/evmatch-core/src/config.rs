//! Match job configuration that downstream crates can serialize/deserialize.
//!
//! Constructed once at startup (defaults -> environment -> CLI overrides)
//! and passed by reference into each component; never mutated afterwards.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    /// File listing dataset A's chunk paths, one per line.
    pub filelist_a: String,

    /// File listing dataset B's chunk paths, one per line.
    pub filelist_b: String,

    /// Namespace prefix applied to dataset A's mirrored field names.
    pub prefix_a: String,

    /// Namespace prefix applied to dataset B's mirrored field names.
    pub prefix_b: String,

    /// Directory output segments are written into.
    pub out_dir: String,

    /// Filename prefix for output segments (`<prefix>_<index>.evc`).
    pub out_prefix: String,

    /// Maximum pre-serialization segment size in bytes. A segment rotates
    /// after the append that pushes it past this bound.
    pub max_segment_bytes: u64,

    /// Verbosity level 0-3 gating phase/progress messages.
    pub verbose: u8,

    /// Progress-print frequency, as a percentage of the driving dataset.
    pub print_every_percent: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            filelist_a: "filelist_a.txt".to_string(),
            filelist_b: "filelist_b.txt".to_string(),
            prefix_a: "A.".to_string(),
            prefix_b: "B.".to_string(),
            out_dir: "output".to_string(),
            out_prefix: "merge".to_string(),
            max_segment_bytes: 500_000_000, // 500 MB before serialization
            verbose: 1,
            print_every_percent: 0.1,
        }
    }
}

impl MatchConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `EVMATCH_FILELIST_A` / `EVMATCH_FILELIST_B`: chunk file lists
    /// - `EVMATCH_PREFIX_A` / `EVMATCH_PREFIX_B`: mirror prefixes
    /// - `EVMATCH_OUT_DIR` / `EVMATCH_OUT_PREFIX`: output location
    /// - `EVMATCH_MAX_SEGMENT_BYTES`: segment rotation bound
    /// - `EVMATCH_VERBOSE`: verbosity 0-3
    /// - `EVMATCH_PRINT_EVERY_PERCENT`: progress frequency
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("EVMATCH_FILELIST_A") {
            cfg.filelist_a = s;
        }

        if let Ok(s) = std::env::var("EVMATCH_FILELIST_B") {
            cfg.filelist_b = s;
        }

        if let Ok(s) = std::env::var("EVMATCH_PREFIX_A") {
            cfg.prefix_a = s;
        }

        if let Ok(s) = std::env::var("EVMATCH_PREFIX_B") {
            cfg.prefix_b = s;
        }

        if let Ok(s) = std::env::var("EVMATCH_OUT_DIR") {
            cfg.out_dir = s;
        }

        if let Ok(s) = std::env::var("EVMATCH_OUT_PREFIX") {
            cfg.out_prefix = s;
        }

        if let Ok(s) = std::env::var("EVMATCH_MAX_SEGMENT_BYTES") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.max_segment_bytes = v;
            }
        }

        if let Ok(s) = std::env::var("EVMATCH_VERBOSE") {
            if let Ok(v) = s.parse::<u8>() {
                cfg.verbose = v.min(3);
            }
        }

        if let Ok(s) = std::env::var("EVMATCH_PRINT_EVERY_PERCENT") {
            if let Ok(v) = s.parse::<f64>() {
                cfg.print_every_percent = v;
            }
        }

        cfg
    }

    /// Output directory with any trailing slash removed.
    pub fn out_dir_normalized(&self) -> &str {
        self.out_dir.trim_end_matches('/')
    }
}
