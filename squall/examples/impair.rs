use std::{sync::Arc, thread, time::Duration};

use squall::{
    CaptureEngine, MemoryCapture, PacketMetadata, RuleConfig, RulesetBuilder,
};

fn main() {
    tracing_subscriber::fmt().init();

    // An in-process loopback capture stands in for the OS driver.
    let capture = Arc::new(MemoryCapture::new());
    let handle = Arc::clone(&capture);
    let engine = CaptureEngine::new(move || Arc::clone(&handle));

    // 100 ms of lag, some jitter on top, and one extra copy per packet.
    engine.swap(
        RulesetBuilder::new()
            .rule(RuleConfig::Lag { delay_ms: 100 })
            .and_then(|b| b.rule(RuleConfig::Jitter { min_ms: 0, max_ms: 30, seed: None }))
            .and_then(|b| b.rule(RuleConfig::Duplicate { copies: 1 }))
            .and_then(RulesetBuilder::build)
            .expect("valid ruleset"),
    );

    engine.start("outbound and udp").expect("engine start");

    // Feed some traffic through.
    let mut packet = vec![0u8; 60];
    packet[0] = 0x45;
    packet[2..4].copy_from_slice(&60u16.to_be_bytes());
    packet[9] = 17;
    for _ in 0..100 {
        capture.push_inbound(&packet, PacketMetadata::default());
    }

    thread::sleep(Duration::from_millis(500));
    engine.stop();

    let stats = engine.stats();
    println!(
        "processed {} packets, forwarded {} (duplicates and delays included)",
        stats.packets_processed(),
        capture.sent_count(),
    );
}
