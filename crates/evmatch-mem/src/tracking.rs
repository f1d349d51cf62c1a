//! Lightweight live/peak allocation tracking for field buffers.
//!
//! Advisory only; reported at verbosity 3 and in trace logs.

#[derive(Debug, Default)]
pub struct AllocTracker {
    live_bytes: usize,
    peak_bytes: usize,
    reallocs: u64,
}

impl AllocTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_alloc(&mut self, bytes: usize) {
        self.live_bytes += bytes;
        if self.live_bytes > self.peak_bytes {
            self.peak_bytes = self.live_bytes;
        }
    }

    pub fn record_realloc(&mut self, old_bytes: usize, new_bytes: usize) {
        self.live_bytes = self.live_bytes - old_bytes + new_bytes;
        if self.live_bytes > self.peak_bytes {
            self.peak_bytes = self.live_bytes;
        }
        self.reallocs += 1;
    }

    pub fn live(&self) -> usize {
        self.live_bytes
    }

    pub fn peak(&self) -> usize {
        self.peak_bytes
    }

    pub fn reallocs(&self) -> u64 {
        self.reallocs
    }
}
