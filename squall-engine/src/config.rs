use std::time::Duration;

use squall_common::constants::KiB;

/// Most capture workers an engine will spawn.
pub const MAX_WORKERS: usize = 16;

/// Engine tuning knobs, applied at [`start`](crate::CaptureEngine::start).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Capture worker threads, each with its own capture handle. `1..=16`.
    pub workers: usize,
    /// Receive buffer size per worker.
    pub buffer_size: usize,
    /// Metadata slots per batch receive, capping packets per call.
    pub batch_size: usize,
    /// Packets a worker processes before flushing its local tally into the
    /// shared telemetry.
    pub flush_interval: u64,
    /// Consecutive receive errors before a worker gives up.
    pub max_consecutive_errors: u64,
    /// How long `stop` waits for each worker to exit.
    pub join_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            buffer_size: 64 * KiB,
            batch_size: 64,
            flush_interval: 1_000,
            max_consecutive_errors: 1_000,
            join_timeout: Duration::from_secs(2),
        }
    }
}

impl EngineConfig {
    /// Sets the worker count, clamped to `1..=16`.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(1, MAX_WORKERS);
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_flush_interval(mut self, flush_interval: u64) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    pub fn with_max_consecutive_errors(mut self, max: u64) -> Self {
        self.max_consecutive_errors = max;
        self
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }
}
