use std::collections::VecDeque;

use parking_lot::Mutex;
use squall_common::now_ticks;
use tracing::{error, info, warn};

/// Severity of a [`PacketLogEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogLevel {
    Info = 0,
    Warning = 1,
    Error = 2,
}

/// What happened. Codes instead of strings keep log records fixed-size and
/// allocation-free on the hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum LogCode {
    None = 0,
    EngineStarted = 1,
    EngineStopped = 2,
    PacketProcessed = 3,
    RecvFailed = 4,
    SendFailed = 5,
    InvalidPacket = 6,
    OperationAborted = 7,
    InvalidHandle = 8,
    InvalidParameter = 9,
}

/// Fixed-size log record. `value` carries the code-specific payload (packet
/// length, counter, worker index).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketLogEntry {
    pub timestamp: i64,
    pub level: LogLevel,
    pub code: LogCode,
    pub value: i64,
}

impl PacketLogEntry {
    /// Creates an entry stamped with the current monotonic tick.
    #[inline]
    pub fn now(level: LogLevel, code: LogCode, value: i64) -> Self {
        Self { timestamp: now_ticks() as i64, level, code, value }
    }
}

/// Sink for fixed-size log records.
pub trait PacketLogger: Send + Sync {
    fn log(&self, entry: PacketLogEntry);
}

/// Forwards records to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl PacketLogger for TracingLogger {
    fn log(&self, entry: PacketLogEntry) {
        match entry.level {
            LogLevel::Info => info!(code = ?entry.code, value = entry.value, "capture event"),
            LogLevel::Warning => warn!(code = ?entry.code, value = entry.value, "capture event"),
            LogLevel::Error => error!(code = ?entry.code, value = entry.value, "capture event"),
        }
    }
}

/// Discards every record. Useful in benches.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl PacketLogger for NullLogger {
    fn log(&self, _entry: PacketLogEntry) {}
}

/// Keeps the most recent records in a fixed-capacity ring, overwriting the
/// oldest once full. Intended for post-mortem inspection without an attached
/// subscriber.
#[derive(Debug)]
pub struct RingLogger {
    entries: Mutex<VecDeque<PacketLogEntry>>,
    capacity: usize,
}

impl RingLogger {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be non-zero");
        Self { entries: Mutex::new(VecDeque::with_capacity(capacity)), capacity }
    }

    /// Copies out the buffered records, oldest first.
    pub fn snapshot(&self) -> Vec<PacketLogEntry> {
        self.entries.lock().iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl PacketLogger for RingLogger {
    fn log(&self, entry: PacketLogEntry) {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }
}
