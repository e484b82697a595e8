//! Memory accounting and the sampling policy that triggers worker recycling

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of the memory figure the pipeline compares against its threshold
pub trait MemoryGauge: Send + Sync {
    /// Bytes currently attributed to the run
    fn used_bytes(&self) -> usize;
}

/// Bytes held by chunks that are dispatched and not yet dropped
///
/// Each dispatched chunk registers its heap footprint and gets an
/// [`ArenaGuard`] that travels with it to the worker; dropping the guard
/// releases the bytes.
#[derive(Debug, Clone, Default)]
pub struct ChunkArena {
    live: Arc<AtomicUsize>,
}

impl ChunkArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve(&self, bytes: usize) -> ArenaGuard {
        self.live.fetch_add(bytes, Ordering::SeqCst);
        ArenaGuard {
            live: Arc::clone(&self.live),
            bytes,
        }
    }

    pub fn live_bytes(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl MemoryGauge for ChunkArena {
    fn used_bytes(&self) -> usize {
        self.live_bytes()
    }
}

#[derive(Debug)]
pub struct ArenaGuard {
    live: Arc<AtomicUsize>,
    bytes: usize,
}

impl Drop for ArenaGuard {
    fn drop(&mut self) {
        self.live.fetch_sub(self.bytes, Ordering::SeqCst);
    }
}

/// Samples a gauge at most once per interval
pub struct MemoryMonitor {
    gauge: Arc<dyn MemoryGauge>,
    threshold: usize,
    interval: Duration,
    last_check: Option<Instant>,
    peak: usize,
}

impl MemoryMonitor {
    pub fn new(gauge: Arc<dyn MemoryGauge>, threshold: usize, interval: Duration) -> Self {
        Self {
            gauge,
            threshold,
            interval,
            last_check: None,
            peak: 0,
        }
    }

    /// Sample if the interval has elapsed; `Some(used)` when over threshold
    pub fn check(&mut self, now: Instant) -> Option<usize> {
        if let Some(last) = self.last_check {
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
        }
        self.last_check = Some(now);
        let used = self.gauge.used_bytes();
        self.peak = self.peak.max(used);
        (used > self.threshold).then_some(used)
    }

    /// Largest value sampled so far
    pub fn peak(&self) -> usize {
        self.peak
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}
