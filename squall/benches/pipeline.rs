use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;

use squall::{
    common::now_ticks, BatchInfo, CaptureResult, ModifyFlags, PacketCapture, PacketMetadata,
    RuleConfig, RulePipeline, RulesetBuilder, ShapedCapture,
};

const PACKET_SIZES: [usize; 3] = [64, 512, 1460];

/// Counts sends and discards the bytes, so iteration never accumulates.
#[derive(Debug, Default)]
struct SinkCapture {
    sent: std::sync::atomic::AtomicU64,
}

impl PacketCapture for SinkCapture {
    fn open(&self, _filter: &str) -> CaptureResult<()> {
        Ok(())
    }

    fn receive(&self, _buffer: &mut [u8], _metadata: &mut PacketMetadata) -> CaptureResult<usize> {
        Ok(0)
    }

    fn receive_batch(
        &self,
        _buffer: &mut [u8],
        _metadata: &mut [PacketMetadata],
    ) -> CaptureResult<BatchInfo> {
        Ok(BatchInfo { total_bytes: 0, packets: 0 })
    }

    fn send(&self, _packet: &[u8], _metadata: &mut PacketMetadata) -> CaptureResult<()> {
        self.sent.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(())
    }

    fn shutdown(&self) {}

    fn calculate_checksums(&self, packet: &mut [u8], metadata: &mut PacketMetadata) {
        squall::calculate_checksums(packet, metadata);
    }
}

fn pipeline_with(configs: &[RuleConfig]) -> Arc<RulePipeline> {
    let mut builder = RulesetBuilder::new();
    for config in configs {
        builder = builder.rule(*config).unwrap();
    }
    let pipeline = Arc::new(RulePipeline::new());
    pipeline.swap(builder.build().unwrap());
    pipeline
}

fn random_packet(len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let mut packet = vec![0u8; len];
    rng.fill(&mut packet[..]);
    packet[0] = 0x45;
    packet[2..4].copy_from_slice(&(len as u16).to_be_bytes());
    packet[9] = 6;
    packet
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_evaluate");

    let shaping_rules = [
        RuleConfig::Throttle { packets_per_sec: 1_000_000 },
        RuleConfig::Bandwidth { bytes_per_sec: 1_000_000_000 },
        RuleConfig::LossPattern { mask: 0, len: 8 },
        RuleConfig::Jitter { min_ms: 0, max_ms: 5, seed: Some(7) },
        RuleConfig::Duplicate { copies: 0 },
        RuleConfig::Tamper { flags: ModifyFlags::NONE },
        RuleConfig::MtuClamp { max_len: 9_000 },
        RuleConfig::WindowClamp { max_window: u16::MAX },
    ];

    for size in PACKET_SIZES {
        let packet = random_packet(size);
        let meta = PacketMetadata::default();

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("empty", size), &packet, |b, packet| {
            let mut handle = pipeline_with(&[]).handle();
            b.iter(|| handle.evaluate(packet, &meta));
        });
        group.bench_with_input(BenchmarkId::new("eight_rules", size), &packet, |b, packet| {
            let mut handle = pipeline_with(&shaping_rules).handle();
            let now = now_ticks();
            b.iter(|| handle.evaluate_at(packet, &meta, now));
        });
    }
    group.finish();
}

fn bench_decorator(c: &mut Criterion) {
    let mut group = c.benchmark_group("decorator_send");

    for size in PACKET_SIZES {
        let packet = random_packet(size);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("forward", size), &packet, |b, packet| {
            let mut shaped =
                ShapedCapture::new(Arc::new(SinkCapture::default()), pipeline_with(&[]).handle());
            let mut meta = PacketMetadata::default();
            b.iter(|| shaped.send(packet, &mut meta));
        });
        group.bench_with_input(BenchmarkId::new("tamper", size), &packet, |b, packet| {
            let rules = [RuleConfig::Tamper { flags: ModifyFlags::CORRUPT }];
            let mut shaped = ShapedCapture::new(
                Arc::new(SinkCapture::default()),
                pipeline_with(&rules).handle(),
            );
            let mut meta = PacketMetadata::default();
            b.iter(|| shaped.send(packet, &mut meta));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_decorator);
criterion_main!(benches);
