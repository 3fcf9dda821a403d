use std::{sync::OnceLock, time::Instant};

/// Tick resolution of the monotonic clock. One tick is one microsecond.
pub const TICKS_PER_SEC: u64 = 1_000_000;

/// Ticks in one millisecond.
pub const TICKS_PER_MS: u64 = TICKS_PER_SEC / 1000;

fn origin() -> Instant {
    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    *ORIGIN.get_or_init(Instant::now)
}

/// Returns the number of ticks elapsed since a process-wide monotonic origin.
///
/// The origin is fixed the first time any thread reads the clock, so tick
/// values are comparable across threads for the lifetime of the process.
#[inline]
pub fn now_ticks() -> u64 {
    origin().elapsed().as_micros() as u64
}

/// Converts milliseconds to clock ticks.
#[inline]
pub const fn ms_to_ticks(ms: u64) -> u64 {
    ms * TICKS_PER_MS
}

/// Converts clock ticks to whole milliseconds, rounding down.
#[inline]
pub const fn ticks_to_ms(ticks: u64) -> u64 {
    ticks / TICKS_PER_MS
}
