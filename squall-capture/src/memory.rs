use std::{
    collections::VecDeque,
    sync::atomic::{AtomicBool, AtomicU32, Ordering},
};

use parking_lot::{Condvar, Mutex};

use crate::{
    checksum, BatchInfo, CaptureError, CaptureResult, PacketCapture, PacketMetadata,
    MAX_FILTER_LEN,
};

/// Default cap on packets returned by a single batch receive.
pub(crate) const MAX_BATCH_PACKETS: usize = 64;

/// An in-process loopback capture provider.
///
/// Packets pushed with [`MemoryCapture::push_inbound`] are handed out by
/// `receive`/`receive_batch` (blocking until something arrives), and packets
/// written with `send` are recorded for inspection. This stands in for the
/// OS interception driver in tests, benches and demos.
#[derive(Debug, Default)]
pub struct MemoryCapture {
    inbound: Mutex<VecDeque<(Vec<u8>, PacketMetadata)>>,
    arrived: Condvar,
    open: AtomicBool,
    shut_down: AtomicBool,
    sent: Mutex<Vec<(Vec<u8>, PacketMetadata)>>,
    fail_sends: AtomicU32,
}

impl MemoryCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a packet for delivery to the next receive call.
    pub fn push_inbound(&self, packet: &[u8], metadata: PacketMetadata) {
        self.inbound.lock().push_back((packet.to_vec(), metadata));
        self.arrived.notify_all();
    }

    /// Number of packets forwarded through `send` so far.
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Copies out every sent packet, in send order.
    pub fn sent_packets(&self) -> Vec<Vec<u8>> {
        self.sent.lock().iter().map(|(p, _)| p.clone()).collect()
    }

    /// Makes the next `n` sends fail with [`CaptureError::Unknown`].
    pub fn fail_next_sends(&self, n: u32) {
        self.fail_sends.store(n, Ordering::SeqCst);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn check_handle(&self) -> CaptureResult<()> {
        if !self.open.load(Ordering::SeqCst) || self.shut_down.load(Ordering::SeqCst) {
            return Err(CaptureError::InvalidHandle);
        }
        Ok(())
    }
}

impl PacketCapture for MemoryCapture {
    fn open(&self, filter: &str) -> CaptureResult<()> {
        if filter.trim().is_empty() || filter.len() > MAX_FILTER_LEN {
            return Err(CaptureError::InvalidFilter);
        }
        self.shut_down.store(false, Ordering::SeqCst);
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn receive(&self, buffer: &mut [u8], metadata: &mut PacketMetadata) -> CaptureResult<usize> {
        self.check_handle()?;
        let mut inbound = self.inbound.lock();
        loop {
            if self.shut_down.load(Ordering::SeqCst) {
                return Err(CaptureError::OperationAborted);
            }
            if let Some((packet, meta)) = inbound.pop_front() {
                if packet.len() > buffer.len() {
                    inbound.push_front((packet, meta));
                    return Err(CaptureError::BufferTooSmall);
                }
                buffer[..packet.len()].copy_from_slice(&packet);
                *metadata = meta;
                return Ok(packet.len());
            }
            self.arrived.wait(&mut inbound);
        }
    }

    fn receive_batch(
        &self,
        buffer: &mut [u8],
        metadata: &mut [PacketMetadata],
    ) -> CaptureResult<BatchInfo> {
        self.check_handle()?;
        if metadata.is_empty() {
            return Err(CaptureError::InvalidParameter);
        }
        let mut inbound = self.inbound.lock();
        loop {
            if self.shut_down.load(Ordering::SeqCst) {
                return Err(CaptureError::OperationAborted);
            }
            if !inbound.is_empty() {
                break;
            }
            self.arrived.wait(&mut inbound);
        }

        let max_packets = metadata.len().min(MAX_BATCH_PACKETS);
        let mut offset = 0;
        let mut packets = 0;
        while packets < max_packets {
            let Some((packet, _)) = inbound.front() else {
                break;
            };
            if offset + packet.len() > buffer.len() {
                if packets == 0 {
                    return Err(CaptureError::BufferTooSmall);
                }
                break;
            }
            let Some((packet, meta)) = inbound.pop_front() else {
                break;
            };
            buffer[offset..offset + packet.len()].copy_from_slice(&packet);
            metadata[packets] = meta;
            metadata[packets].batch_length = packet.len() as u32;
            offset += packet.len();
            packets += 1;
        }

        Ok(BatchInfo { total_bytes: offset, packets })
    }

    fn send(&self, packet: &[u8], metadata: &mut PacketMetadata) -> CaptureResult<()> {
        self.check_handle()?;
        if self.fail_sends.load(Ordering::SeqCst) > 0 {
            self.fail_sends.fetch_sub(1, Ordering::SeqCst);
            return Err(CaptureError::Unknown);
        }
        self.sent.lock().push((packet.to_vec(), *metadata));
        Ok(())
    }

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        self.arrived.notify_all();
    }

    fn calculate_checksums(&self, packet: &mut [u8], metadata: &mut PacketMetadata) {
        checksum::calculate_checksums(packet, metadata);
    }
}
