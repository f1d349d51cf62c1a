//! Advisory progress reporting for the driving loop.
//!
//! Periodic, non-authoritative text: position in the driving dataset,
//! match counts relative to both datasets, elapsed time, ETA, throughput.

use std::time::{Duration, Instant};

use tracing::info;

use crate::matcher::MatchStats;

pub struct ProgressReporter {
    enabled: bool,
    total_driving: u64,
    total_a: u64,
    total_b: u64,
    /// Records between reports, derived from the configured percentage.
    every: u64,
    started: Instant,
}

impl ProgressReporter {
    pub fn new(
        enabled: bool,
        total_driving: u64,
        total_a: u64,
        total_b: u64,
        print_every_percent: f64,
    ) -> Self {
        let every = ((print_every_percent / 100.0) * total_driving as f64) as u64;
        Self {
            enabled,
            total_driving,
            total_a,
            total_b,
            every: every.max(1),
            started: Instant::now(),
        }
    }

    /// Emit a progress line if this record falls on a report boundary.
    pub fn maybe_report(&self, stats: MatchStats) {
        if !self.enabled || stats.processed % self.every != 0 {
            return;
        }
        let elapsed = self.started.elapsed();
        let processed = stats.processed.max(1);
        let rate = processed as f64 / elapsed.as_secs_f64().max(1e-9);
        let remaining = self.total_driving.saturating_sub(stats.processed);
        let eta = Duration::from_secs_f64(remaining as f64 / rate.max(1e-9));

        info!(
            processed = stats.processed,
            total = self.total_driving,
            percent = format_args!(
                "{:.3}",
                stats.processed as f64 / self.total_driving.max(1) as f64 * 100.0
            ),
            matched = stats.matched,
            match_a = format_args!("{:.3}%", percent(stats.matched, self.total_a)),
            match_b = format_args!("{:.3}%", percent(stats.matched, self.total_b)),
            elapsed = %format_hms(elapsed),
            eta = %format_hms(eta),
            rate = format_args!("{rate:.2} rec/s"),
            "progress"
        );
    }
}

fn percent(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64 * 100.0
    }
}

/// Render a duration as HH:MM:SS.
pub fn format_hms(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hms_formatting() {
        assert_eq!(format_hms(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_hms(Duration::from_secs(3_725)), "01:02:05");
    }
}
