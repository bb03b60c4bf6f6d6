//! Latency metrics
//!
//! A fixed-size ring of duration samples used by the HTTP middleware and
//! the socket send path to report p99 latencies.

use std::sync::Mutex;
use std::time::Duration;

/// Number of samples retained per ring
const RING_CAPACITY: usize = 100;

/// Fixed-size ring buffer of duration samples with percentile reporting.
///
/// Storage is allocated lazily on the first `record`, so an idle ring
/// costs nothing beyond the mutex.
#[derive(Debug, Default)]
pub struct LatencyRing {
    inner: Mutex<RingState>,
}

#[derive(Debug, Default)]
struct RingState {
    samples: Vec<Duration>,
    idx: usize,
    full: bool,
}

impl LatencyRing {
    /// Create an empty ring
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a duration sample, overwriting the oldest once full
    pub fn record(&self, sample: Duration) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if state.samples.is_empty() {
            state.samples = vec![Duration::ZERO; RING_CAPACITY];
        }
        let idx = state.idx;
        state.samples[idx] = sample;
        state.idx = (idx + 1) % RING_CAPACITY;
        if state.idx == 0 {
            state.full = true;
        }
    }

    /// The 99th percentile of the retained samples, or zero when empty
    #[must_use]
    pub fn p99(&self) -> Duration {
        let mut snapshot = self.snapshot();
        if snapshot.is_empty() {
            return Duration::ZERO;
        }
        snapshot.sort_unstable();
        let idx = (snapshot.len() - 1) * 99 / 100;
        snapshot[idx]
    }

    /// Copy out the currently retained samples
    fn snapshot(&self) -> Vec<Duration> {
        let state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if state.full {
            state.samples.clone()
        } else {
            state.samples[..state.idx].to_vec()
        }
    }
}
