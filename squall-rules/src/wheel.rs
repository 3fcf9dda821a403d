use bytes::BytesMut;
use squall_capture::PacketMetadata;
use squall_common::now_ticks;

/// Number of wheel slots. Power of two so the slot index is a mask.
pub const WHEEL_SLOTS: usize = 1024;

/// Width of one slot in clock ticks (1 ms).
pub const TICKS_PER_SLOT: u64 = 1_000;

/// A packet parked until its due tick.
#[derive(Debug)]
struct DelayedPacket {
    due_ticks: u64,
    packet: BytesMut,
    metadata: PacketMetadata,
}

/// Hashed timing wheel for delayed packet dispatch.
///
/// Each slot covers [`TICKS_PER_SLOT`] ticks; a packet lands in the slot of
/// its due tick and [`tick`](Self::tick) releases it once that tick has
/// passed. Delays must stay below the wheel horizon
/// (`WHEEL_SLOTS × TICKS_PER_SLOT`, about one second) so a slot never holds
/// packets from two revolutions at once; the ruleset builder enforces that
/// bound. Released buffers return to an internal pool, so a steady delay
/// load settles into zero allocation.
///
/// Single-threaded by design: each worker owns one wheel and drives it
/// between receive batches.
#[derive(Debug)]
pub struct TimeWheelScheduler {
    slots: Vec<Vec<DelayedPacket>>,
    /// Tick the last sweep ended on.
    prev_ticks: u64,
    pending: usize,
    pool: Vec<BytesMut>,
    /// Buffers ever taken out over the pool's lifetime; every one is either
    /// parked in a slot or back in the pool.
    allocated: usize,
}

impl TimeWheelScheduler {
    pub fn new() -> Self {
        Self::with_origin(now_ticks())
    }

    /// A wheel whose cursor starts at `origin_ticks`.
    pub fn with_origin(origin_ticks: u64) -> Self {
        let mut slots = Vec::with_capacity(WHEEL_SLOTS);
        slots.resize_with(WHEEL_SLOTS, Vec::new);
        Self { slots, prev_ticks: origin_ticks, pending: 0, pool: Vec::new(), allocated: 0 }
    }

    /// Parks a copy of `packet` for `delay_ticks` from now.
    pub fn enqueue(&mut self, packet: &[u8], metadata: PacketMetadata, delay_ticks: u64) {
        let now = now_ticks();
        self.enqueue_at(packet, metadata, now + delay_ticks);
    }

    /// Parks a copy of `packet` until the absolute tick `due_ticks`.
    pub fn enqueue_at(&mut self, packet: &[u8], metadata: PacketMetadata, due_ticks: u64) {
        let mut buf = self.pool.pop().unwrap_or_else(|| {
            self.allocated += 1;
            BytesMut::new()
        });
        buf.clear();
        buf.extend_from_slice(packet);
        self.slots[slot_of(due_ticks)].push(DelayedPacket { due_ticks, packet: buf, metadata });
        self.pending += 1;
    }

    /// Releases every packet whose due tick has passed, in slot order.
    pub fn tick(&mut self, release: impl FnMut(&[u8], &mut PacketMetadata)) {
        self.tick_at(now_ticks(), release);
    }

    /// Releases due packets as of the absolute tick `now_ticks`.
    pub fn tick_at(&mut self, now_ticks: u64, mut release: impl FnMut(&[u8], &mut PacketMetadata)) {
        if self.pending == 0 {
            self.prev_ticks = now_ticks;
            return;
        }

        // Sweep from the previous cursor slot up to and including the
        // current one; a gap of a revolution or more means a full sweep.
        let elapsed = now_ticks.saturating_sub(self.prev_ticks);
        let span = if elapsed >= WHEEL_SLOTS as u64 * TICKS_PER_SLOT {
            WHEEL_SLOTS - 1
        } else {
            (slot_of(now_ticks) + WHEEL_SLOTS - slot_of(self.prev_ticks)) % WHEEL_SLOTS
        };
        let start = slot_of(self.prev_ticks);
        for step in 0..=span {
            let slot = (start + step) & (WHEEL_SLOTS - 1);
            self.drain_slot(slot, now_ticks, &mut release);
        }
        self.prev_ticks = now_ticks;
    }

    fn drain_slot(
        &mut self,
        slot: usize,
        now_ticks: u64,
        release: &mut impl FnMut(&[u8], &mut PacketMetadata),
    ) {
        // Reverse index so swap_remove never skips an entry.
        let mut i = self.slots[slot].len();
        while i > 0 {
            i -= 1;
            if self.slots[slot][i].due_ticks > now_ticks {
                continue;
            }
            let mut entry = self.slots[slot].swap_remove(i);
            self.pending -= 1;
            release(&entry.packet, &mut entry.metadata);
            self.pool.push(entry.packet);
        }
    }

    /// Packets currently parked.
    #[inline]
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Buffers sitting in the reuse pool.
    #[inline]
    pub fn pooled_buffers(&self) -> usize {
        self.pool.len()
    }
}

impl Default for TimeWheelScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TimeWheelScheduler {
    fn drop(&mut self) {
        // Every buffer ever allocated is either parked or pooled.
        debug_assert_eq!(
            self.pending + self.pool.len(),
            self.allocated,
            "time wheel leaked a packet buffer"
        );
    }
}

#[inline]
fn slot_of(ticks: u64) -> usize {
    (ticks / TICKS_PER_SLOT) as usize & (WHEEL_SLOTS - 1)
}
