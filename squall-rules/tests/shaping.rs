//! End-to-end shaping behavior through the public API: verdict
//! accumulation, short-circuiting and concurrent ruleset hot-swapping.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use squall_capture::{MemoryCapture, PacketMetadata};
use squall_common::now_ticks;
use squall_rules::{
    ModifyFlags, RuleConfig, RulePipeline, RulesetBuilder, ShapedCapture,
};

fn build(configs: &[RuleConfig]) -> Arc<RulePipeline> {
    let mut builder = RulesetBuilder::new();
    for config in configs {
        builder = builder.rule(*config).expect("valid rule config");
    }
    let pipeline = Arc::new(RulePipeline::new());
    pipeline.swap(builder.build().expect("valid ruleset"));
    pipeline
}

fn evaluate_once(configs: &[RuleConfig]) -> squall_rules::ActionResult {
    let pipeline = build(configs);
    let mut handle = pipeline.handle();
    handle.evaluate(&[0u8; 128], &PacketMetadata::default())
}

#[test]
fn drop_rule_starves_everything_behind_it() {
    let pipeline = build(&[RuleConfig::Drop, RuleConfig::Duplicate { copies: 2 }]);
    let mut handle = pipeline.handle();

    let result = handle.evaluate(&[0u8; 128], &PacketMetadata::default());
    assert!(result.should_short_circuit());
    assert_eq!(result.duplicate_count, 0);
    // The duplicate rule was never invoked.
    assert_eq!(handle.rule_counters(), vec![1, 0]);

    // And the decorator forwards nothing.
    let capture = Arc::new(MemoryCapture::new());
    let mut shaped = ShapedCapture::new(Arc::clone(&capture), pipeline.handle());
    shaped.send(&[0u8; 128], &mut PacketMetadata::default()).expect("drop reports success");
    assert_eq!(capture.sent_count(), 0);
}

#[test]
fn delay_accumulation_is_order_independent() {
    let forward = evaluate_once(&[RuleConfig::Lag { delay_ms: 50 }, RuleConfig::Lag { delay_ms: 10 }]);
    let reverse = evaluate_once(&[RuleConfig::Lag { delay_ms: 10 }, RuleConfig::Lag { delay_ms: 50 }]);
    assert_eq!(forward.delay_ticks, reverse.delay_ticks);
    assert_eq!(forward.delay_ticks, squall_common::ms_to_ticks(50));
}

#[test]
fn duplicate_accumulation_is_order_independent() {
    let forward =
        evaluate_once(&[RuleConfig::Duplicate { copies: 2 }, RuleConfig::Duplicate { copies: 5 }]);
    let reverse =
        evaluate_once(&[RuleConfig::Duplicate { copies: 5 }, RuleConfig::Duplicate { copies: 2 }]);
    assert_eq!(forward.duplicate_count, 5);
    assert_eq!(reverse.duplicate_count, 5);
}

#[test]
fn modify_flags_merge_across_rules() {
    let result = evaluate_once(&[
        RuleConfig::Tamper { flags: ModifyFlags::CORRUPT },
        RuleConfig::Tamper { flags: ModifyFlags::REWRITE },
    ]);
    assert!(result.modify_flags.contains(ModifyFlags::CORRUPT | ModifyFlags::REWRITE));
}

#[test]
fn throttle_admits_exactly_the_configured_rate() {
    let pipeline = build(&[RuleConfig::Throttle { packets_per_sec: 8 }]);
    let mut handle = pipeline.handle();
    let meta = PacketMetadata::default();

    // A frozen clock keeps the bucket from refilling mid-test.
    let now = now_ticks();
    let mut dropped = 0;
    for _ in 0..9 {
        if handle.evaluate_at(&[0u8; 64], &meta, now).should_short_circuit() {
            dropped += 1;
        }
    }
    assert_eq!(dropped, 1);
}

#[test]
fn hot_swap_under_load_never_tears() {
    let _ = tracing_subscriber::fmt::try_init();

    let pipeline = build(&[]);
    let stop = Arc::new(AtomicBool::new(false));

    let swapper = {
        let pipeline = Arc::clone(&pipeline);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut flip = false;
            while !stop.load(Ordering::Relaxed) {
                let mut builder = RulesetBuilder::new();
                if flip {
                    for _ in 0..5 {
                        builder = builder
                            .rule(RuleConfig::Lag { delay_ms: 1 })
                            .and_then(|b| b.rule(RuleConfig::Duplicate { copies: 1 }))
                            .expect("valid rule config");
                    }
                }
                flip = !flip;
                pipeline.swap(builder.build().expect("valid ruleset"));
            }
        })
    };

    let evaluators: Vec<_> = (0..2)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut handle = pipeline.handle();
                let meta = PacketMetadata::default();
                let mut processed = 0u64;
                while !stop.load(Ordering::Relaxed) {
                    let result = handle.evaluate(&[0u8; 256], &meta);
                    // Every evaluation sees one coherent ruleset: either
                    // the empty one (identity) or all ten rules.
                    if result.mask.contains(squall_rules::ActionMask::DELAY) {
                        assert!(result.delay_ticks > 0);
                        assert_eq!(result.duplicate_count, 1);
                    } else {
                        assert_eq!(result, squall_rules::ActionResult::identity());
                    }
                    processed += 1;
                }
                processed
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(500));
    stop.store(true, Ordering::Relaxed);

    swapper.join().expect("swapper thread");
    for evaluator in evaluators {
        assert!(evaluator.join().expect("evaluator thread") > 0);
    }
}
