use std::collections::VecDeque;

use bytes::BytesMut;
use squall_capture::PacketMetadata;

/// Most injection packets that can wait between flushes.
pub const INJECT_QUEUE_CAPACITY: usize = 64;

/// Bounded FIFO of packets waiting to be injected into the stream.
///
/// Rules signal injection through [`crate::ActionResult::inject_packet_id`];
/// the send path materializes the packet and parks it here, and the worker
/// flushes the queue between receive batches. A full queue sheds the new
/// packet rather than the backlog, since injected traffic is advisory.
/// Single-threaded like the scheduler: one queue per worker.
#[derive(Debug)]
pub struct InjectQueue {
    queue: VecDeque<(BytesMut, PacketMetadata)>,
    pool: Vec<BytesMut>,
    /// Buffers ever taken out over the pool's lifetime; every one is either
    /// queued or back in the pool.
    allocated: usize,
}

impl InjectQueue {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::with_capacity(INJECT_QUEUE_CAPACITY),
            pool: Vec::new(),
            allocated: 0,
        }
    }

    /// Parks a copy of `packet` for injection. Returns `false` (and keeps
    /// the queue untouched) when the queue is full.
    pub fn enqueue(&mut self, packet: &[u8], metadata: PacketMetadata) -> bool {
        if self.queue.len() == INJECT_QUEUE_CAPACITY {
            return false;
        }
        let mut buf = self.pool.pop().unwrap_or_else(|| {
            self.allocated += 1;
            BytesMut::new()
        });
        buf.clear();
        buf.extend_from_slice(packet);
        self.queue.push_back((buf, metadata));
        true
    }

    /// Hands every queued packet to `send` in arrival order and returns how
    /// many were flushed.
    pub fn flush(&mut self, mut send: impl FnMut(&[u8], &mut PacketMetadata)) -> usize {
        let flushed = self.queue.len();
        while let Some((buf, mut metadata)) = self.queue.pop_front() {
            send(&buf, &mut metadata);
            self.pool.push(buf);
        }
        flushed
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for InjectQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InjectQueue {
    fn drop(&mut self) {
        // Every buffer ever allocated is either queued or pooled.
        debug_assert_eq!(
            self.queue.len() + self.pool.len(),
            self.allocated,
            "inject queue leaked a packet buffer"
        );
    }
}
