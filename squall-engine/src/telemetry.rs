use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Session counters shared between workers and observers.
///
/// Workers never touch these per packet; they batch increments in a
/// [`WorkerTally`] and flush it periodically, so the atomics see one add per
/// flush interval instead of one per packet. The consecutive-error streak is
/// the exception: it feeds the engine's fault policy and must be current.
#[derive(Debug, Default)]
pub struct EngineTelemetry {
    /// Packets that completed the decorator path.
    packets_processed: AtomicU64,
    /// Failed batch receives.
    receive_errors: AtomicU64,
    /// Failed sends, including duplicate copies and deferred dispatch.
    send_errors: AtomicU64,
    /// Packets with impossible lengths, skipped without processing.
    invalid_packets: AtomicU64,
    /// Errors since the last successful operation, across all workers.
    consecutive_errors: AtomicU64,
}

impl EngineTelemetry {
    #[inline]
    pub(crate) fn flush(&self, tally: &mut WorkerTally) {
        if tally.packets_processed > 0 {
            self.packets_processed.fetch_add(tally.packets_processed, Ordering::Relaxed);
        }
        if tally.receive_errors > 0 {
            self.receive_errors.fetch_add(tally.receive_errors, Ordering::Relaxed);
        }
        if tally.send_errors > 0 {
            self.send_errors.fetch_add(tally.send_errors, Ordering::Relaxed);
        }
        if tally.invalid_packets > 0 {
            self.invalid_packets.fetch_add(tally.invalid_packets, Ordering::Relaxed);
        }
        *tally = WorkerTally::default();
    }

    /// Bumps the shared error streak and returns the new value.
    #[inline]
    pub(crate) fn record_error(&self) -> u64 {
        self.consecutive_errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// A successful operation ends the streak.
    #[inline]
    pub(crate) fn record_success(&self) {
        self.consecutive_errors.store(0, Ordering::Relaxed);
    }

    /// Zeroes every counter at session start.
    pub(crate) fn reset(&self) {
        self.packets_processed.store(0, Ordering::Relaxed);
        self.receive_errors.store(0, Ordering::Relaxed);
        self.send_errors.store(0, Ordering::Relaxed);
        self.invalid_packets.store(0, Ordering::Relaxed);
        self.consecutive_errors.store(0, Ordering::Relaxed);
    }

    #[inline]
    pub fn packets_processed(&self) -> u64 {
        self.packets_processed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn receive_errors(&self) -> u64 {
        self.receive_errors.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn send_errors(&self) -> u64 {
        self.send_errors.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn invalid_packets(&self) -> u64 {
        self.invalid_packets.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn consecutive_errors(&self) -> u64 {
        self.consecutive_errors.load(Ordering::Relaxed)
    }
}

/// Observer handle over the session counters.
#[derive(Debug, Clone, derive_more::Deref)]
pub struct EngineStats {
    inner: Arc<EngineTelemetry>,
}

impl EngineStats {
    pub(crate) fn new(inner: Arc<EngineTelemetry>) -> Self {
        Self { inner }
    }
}

/// One worker's local counters, flushed into [`EngineTelemetry`] every
/// flush interval.
#[derive(Debug, Default)]
pub(crate) struct WorkerTally {
    pub(crate) packets_processed: u64,
    pub(crate) receive_errors: u64,
    pub(crate) send_errors: u64,
    pub(crate) invalid_packets: u64,
    /// Packets since the last flush, against the flush interval.
    pub(crate) since_flush: u64,
}
