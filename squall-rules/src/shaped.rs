use squall_capture::{CaptureResult, PacketCapture, PacketMetadata};
use squall_common::now_ticks;
use tracing::trace;

use crate::{
    action::{ActionMask, ActionResult, ModifyFlags},
    inject::InjectQueue,
    pipeline::PipelineHandle,
    tcp,
    wheel::TimeWheelScheduler,
};

/// Largest packet the send path will modify in place. Bigger packets skip
/// modification and go out untouched; the scratch buffer lives on the stack.
pub const MAX_MODIFY_LEN: usize = 2048;

/// Window value written when a clamp fires, matching the rule's purpose of
/// forcing the peer into small sends.
const WINDOW_CLAMP_VALUE: u16 = 1024;

/// Payload byte flipped by corrupt, past the usual 40 header bytes.
const CORRUPT_OFFSET: usize = 50;

/// First payload byte zeroed by rewrite.
const REWRITE_OFFSET: usize = 60;

/// Send-side decorator that turns pipeline verdicts into packet fates.
///
/// Per packet: evaluate, then drop/blackhole (absorb silently), duplicate
/// (extra copies of the original buffer), modify (copy into a stack scratch,
/// rewrite bytes, recompute checksums), delay (park in the wheel) or forward
/// straight to the wrapped capture. One decorator per worker thread; the
/// scheduler and inject queue it owns are driven by [`tick`](Self::tick)
/// between batches.
#[derive(Debug)]
pub struct ShapedCapture<C: PacketCapture> {
    inner: C,
    pipeline: PipelineHandle,
    scheduler: TimeWheelScheduler,
    inject: InjectQueue,
    /// Failed sends on paths where the error cannot surface through a
    /// return value: duplicate copies, wheel releases and inject flushes.
    send_errors: u64,
}

impl<C: PacketCapture> ShapedCapture<C> {
    pub fn new(inner: C, pipeline: PipelineHandle) -> Self {
        Self {
            inner,
            pipeline,
            scheduler: TimeWheelScheduler::new(),
            inject: InjectQueue::new(),
            send_errors: 0,
        }
    }

    /// The wrapped capture.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Queue for out-of-band packet injection. Flushed by
    /// [`tick`](Self::tick); injected packets bypass rule evaluation so an
    /// injection can never trigger further injections.
    pub fn inject_queue(&mut self) -> &mut InjectQueue {
        &mut self.inject
    }

    /// Packets parked in the delay wheel.
    pub fn pending_delayed(&self) -> usize {
        self.scheduler.pending()
    }

    /// Evaluates the pipeline and carries out the verdict.
    pub fn send(&mut self, packet: &[u8], metadata: &mut PacketMetadata) -> CaptureResult<()> {
        self.send_at(packet, metadata, now_ticks())
    }

    /// [`send`](Self::send) at an explicit tick, for deterministic tests.
    pub fn send_at(
        &mut self,
        packet: &[u8],
        metadata: &mut PacketMetadata,
        now_ticks: u64,
    ) -> CaptureResult<()> {
        let result = self.pipeline.evaluate_at(packet, metadata, now_ticks);

        if result.mask.intersects(ActionMask::DROP | ActionMask::BLACKHOLE) {
            trace!(len = packet.len(), "packet absorbed");
            return Ok(());
        }

        // Extra copies always carry the original bytes, even when the
        // primary packet is about to be modified or delayed.
        if result.mask.contains(ActionMask::DUPLICATE) && result.duplicate_count > 0 {
            for _ in 0..result.duplicate_count {
                let mut copy_meta = *metadata;
                if let Err(err) = self.inner.send(packet, &mut copy_meta) {
                    self.send_errors += 1;
                    trace!(%err, "duplicate send failed");
                }
            }
        }

        if result.mask.contains(ActionMask::MODIFY)
            && !result.modify_flags.is_none()
            && packet.len() <= MAX_MODIFY_LEN
        {
            let mut scratch = [0u8; MAX_MODIFY_LEN];
            let modified = &mut scratch[..packet.len()];
            modified.copy_from_slice(packet);
            apply_modifications(modified, result.modify_flags);
            self.inner.calculate_checksums(modified, metadata);
            return self.finish(modified, metadata, &result, now_ticks);
        }

        self.finish(packet, metadata, &result, now_ticks)
    }

    fn finish(
        &mut self,
        packet: &[u8],
        metadata: &mut PacketMetadata,
        result: &ActionResult,
        now_ticks: u64,
    ) -> CaptureResult<()> {
        if result.mask.contains(ActionMask::DELAY) && result.delay_ticks > 0 {
            self.scheduler.enqueue_at(packet, *metadata, now_ticks + result.delay_ticks);
            return Ok(());
        }
        self.inner.send(packet, metadata)
    }

    /// Releases due delayed packets and flushes the inject queue. Returns
    /// how many packets were dispatched.
    pub fn tick(&mut self) -> usize {
        self.tick_at(now_ticks())
    }

    /// [`tick`](Self::tick) at an explicit tick.
    pub fn tick_at(&mut self, now_ticks: u64) -> usize {
        let inner = &self.inner;
        let mut dispatched = 0;
        let mut failed = 0;
        self.scheduler.tick_at(now_ticks, |packet, metadata| {
            dispatched += 1;
            if let Err(err) = inner.send(packet, metadata) {
                failed += 1;
                trace!(%err, "delayed send failed");
            }
        });
        dispatched += self.inject.flush(|packet, metadata| {
            if let Err(err) = inner.send(packet, metadata) {
                failed += 1;
                trace!(%err, "inject send failed");
            }
        });
        self.send_errors += failed;
        dispatched
    }

    /// Drains the count of failed sends on the deferred paths (duplicates,
    /// wheel releases, inject flushes). [`send`](Self::send) reports only
    /// the primary packet's fate, so these failures surface here instead.
    pub fn take_send_errors(&mut self) -> u64 {
        std::mem::take(&mut self.send_errors)
    }

    /// Shuts down the wrapped capture, unblocking a pending receive.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }
}

fn apply_modifications(packet: &mut [u8], flags: ModifyFlags) {
    if flags.contains(ModifyFlags::CORRUPT) && packet.len() > CORRUPT_OFFSET {
        packet[CORRUPT_OFFSET] ^= 0xFF;
    }
    if flags.contains(ModifyFlags::REWRITE) && packet.len() > REWRITE_OFFSET {
        packet[REWRITE_OFFSET..].fill(0);
    }
    if flags.contains(ModifyFlags::WINDOW_CLAMP) {
        if let Some(off) = tcp::tcp_window_offset(packet) {
            let current = u16::from_be_bytes([packet[off], packet[off + 1]]);
            let clamped = current.min(WINDOW_CLAMP_VALUE);
            packet[off..off + 2].copy_from_slice(&clamped.to_be_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use squall_capture::MemoryCapture;

    use super::*;
    use crate::{
        builder::{RuleConfig, RulesetBuilder},
        pipeline::RulePipeline,
        tcp::testutil::tcp_packet,
        tcp::TCP_FLAG_ACK,
    };

    fn shaped(configs: &[RuleConfig]) -> ShapedCapture<Arc<MemoryCapture>> {
        let mut builder = RulesetBuilder::new();
        for config in configs {
            builder = builder.rule(*config).unwrap();
        }
        let pipeline = Arc::new(RulePipeline::new());
        pipeline.swap(builder.build().unwrap());
        let capture = Arc::new(MemoryCapture::new());
        capture.open("true").unwrap();
        ShapedCapture::new(capture, pipeline.handle())
    }

    fn meta() -> PacketMetadata {
        PacketMetadata::default()
    }

    #[test]
    fn empty_pipeline_forwards_untouched() {
        let mut shaped = shaped(&[]);
        let packet = tcp_packet(TCP_FLAG_ACK, 4096, 20);
        shaped.send_at(&packet, &mut meta(), 0).unwrap();

        assert_eq!(shaped.inner().sent_packets(), vec![packet]);
    }

    #[test]
    fn drop_reports_success_without_forwarding() {
        let mut shaped = shaped(&[RuleConfig::Drop]);
        shaped.send_at(&tcp_packet(TCP_FLAG_ACK, 4096, 20), &mut meta(), 0).unwrap();
        assert_eq!(shaped.inner().sent_count(), 0);
    }

    #[test]
    fn duplicates_carry_the_original_bytes() {
        let mut shaped = shaped(&[
            RuleConfig::Duplicate { copies: 2 },
            RuleConfig::Tamper { flags: ModifyFlags::CORRUPT },
        ]);
        let packet = tcp_packet(TCP_FLAG_ACK, 4096, 40);
        shaped.send_at(&packet, &mut meta(), 0).unwrap();

        let sent = shaped.inner().sent_packets();
        assert_eq!(sent.len(), 3);
        // Two copies unmodified, the primary corrupted at the fixed offset.
        assert_eq!(sent[0], packet);
        assert_eq!(sent[1], packet);
        assert_eq!(sent[2][CORRUPT_OFFSET], packet[CORRUPT_OFFSET] ^ 0xFF);
    }

    #[test]
    fn corrupt_flips_exactly_one_byte() {
        let mut shaped = shaped(&[RuleConfig::Tamper { flags: ModifyFlags::CORRUPT }]);
        let packet = tcp_packet(TCP_FLAG_ACK, 4096, 40);
        shaped.send_at(&packet, &mut meta(), 0).unwrap();

        // Aside from the recomputed checksums, exactly one byte differs.
        let mut expected = packet.clone();
        expected[CORRUPT_OFFSET] ^= 0xFF;
        squall_capture::calculate_checksums(&mut expected, &mut meta());
        assert_eq!(shaped.inner().sent_packets(), vec![expected]);
    }

    #[test]
    fn oversized_packets_skip_modification() {
        let mut shaped = shaped(&[RuleConfig::Tamper { flags: ModifyFlags::CORRUPT }]);
        let packet = tcp_packet(TCP_FLAG_ACK, 4096, MAX_MODIFY_LEN);
        shaped.send_at(&packet, &mut meta(), 0).unwrap();
        assert_eq!(shaped.inner().sent_packets(), vec![packet]);
    }

    #[test]
    fn window_clamp_rewrites_the_window_field() {
        let mut shaped = shaped(&[RuleConfig::WindowClamp { max_window: 2_000 }]);
        shaped.send_at(&tcp_packet(TCP_FLAG_ACK, 60_000, 0), &mut meta(), 0).unwrap();

        let sent = shaped.inner().sent_packets();
        let window = u16::from_be_bytes([sent[0][34], sent[0][35]]);
        assert_eq!(window, WINDOW_CLAMP_VALUE);
    }

    #[test]
    fn delayed_packets_surface_on_tick() {
        let mut shaped = shaped(&[RuleConfig::Lag { delay_ms: 5 }]);
        let packet = tcp_packet(TCP_FLAG_ACK, 4096, 0);
        shaped.send_at(&packet, &mut meta(), 0).unwrap();

        assert_eq!(shaped.inner().sent_count(), 0);
        assert_eq!(shaped.pending_delayed(), 1);

        assert_eq!(shaped.tick_at(4_000), 0);
        assert_eq!(shaped.tick_at(5_000), 1);
        assert_eq!(shaped.inner().sent_packets(), vec![packet]);
    }

    #[test]
    fn injected_packets_flush_on_tick() {
        let mut shaped = shaped(&[]);
        assert!(shaped.inject_queue().enqueue(b"rst", meta()));
        assert_eq!(shaped.tick_at(0), 1);
        assert_eq!(shaped.inner().sent_packets(), vec![b"rst".to_vec()]);
    }

    #[test]
    fn deferred_send_failures_are_counted() {
        let mut shaped = shaped(&[RuleConfig::Lag { delay_ms: 5 }]);
        shaped.send_at(&tcp_packet(TCP_FLAG_ACK, 4096, 0), &mut meta(), 0).unwrap();

        shaped.inner().fail_next_sends(1);
        assert_eq!(shaped.tick_at(5_000), 1);
        assert_eq!(shaped.inner().sent_count(), 0);
        assert_eq!(shaped.take_send_errors(), 1);
        // Draining resets the counter.
        assert_eq!(shaped.take_send_errors(), 0);
    }

    #[test]
    fn duplicate_send_failures_are_counted() {
        let mut shaped = shaped(&[RuleConfig::Duplicate { copies: 2 }]);
        let packet = tcp_packet(TCP_FLAG_ACK, 4096, 0);

        // Both copies fail; the primary goes through and send reports Ok.
        shaped.inner().fail_next_sends(2);
        shaped.send_at(&packet, &mut meta(), 0).unwrap();
        assert_eq!(shaped.inner().sent_packets(), vec![packet]);
        assert_eq!(shaped.take_send_errors(), 2);
    }
}
