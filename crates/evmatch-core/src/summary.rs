//! Machine-readable summary of one matching run.
//!
//! Emitted after successful execution; the CLI also prints a human summary
//! derived from the same numbers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: RunId,

    /// Crate version string for provenance.
    pub version: String,

    /// Total records in dataset A / dataset B (pre role resolution).
    pub total_a: u64,
    pub total_b: u64,

    /// Driving records examined (the full driving dataset on success).
    pub processed: u64,

    /// Merged records emitted; equals the sum of all segment record counts.
    pub matched: u64,

    /// Number of finalized output segments.
    pub segments_written: u32,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl RunSummary {
    pub fn new(total_a: u64, total_b: u64, started_ms: u64) -> Self {
        Self {
            id: RunId(Uuid::new_v4()),
            version: crate::VERSION.to_string(),
            total_a,
            total_b,
            processed: 0,
            matched: 0,
            segments_written: 0,
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn match_rate_a(&self) -> f64 {
        percent(self.matched, self.total_a)
    }

    pub fn match_rate_b(&self) -> f64 {
        percent(self.matched, self.total_b)
    }
}

fn percent(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64 * 100.0
    }
}
