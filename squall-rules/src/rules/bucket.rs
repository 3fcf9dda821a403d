use squall_capture::PacketMetadata;
use squall_common::TICKS_PER_SEC;

use crate::{
    action::{ActionMask, ActionResult},
    state::RuleState,
};

/// Token bucket state for [`throttle`]: tokens are packets.
pub fn throttle_state(packets_per_sec: u32, now_ticks: u64) -> RuleState {
    let rate = u64::from(packets_per_sec);
    // Start full so the first burst up to the rate passes.
    RuleState::TokenBucket { counter: 0, last_tick: now_ticks, tokens: rate, rate, capacity: rate }
}

/// Token bucket state for [`bandwidth`]: tokens are bytes.
pub fn bandwidth_state(bytes_per_sec: u32, now_ticks: u64) -> RuleState {
    let rate = u64::from(bytes_per_sec);
    RuleState::TokenBucket { counter: 0, last_tick: now_ticks, tokens: rate, rate, capacity: rate }
}

/// Continuous refill: `elapsed × rate / tick frequency`, capped at capacity.
/// `last_tick` only advances when at least one whole token accrues, so
/// fractional refill is not lost to rounding. The product is taken in u128:
/// a multi-gigabyte rate times a long idle gap overflows u64 well within a
/// session's lifetime.
#[inline]
fn refill(last_tick: &mut u64, tokens: &mut u64, rate: u64, capacity: u64, now_ticks: u64) {
    let elapsed = now_ticks.saturating_sub(*last_tick);
    let accrued = u128::from(elapsed) * u128::from(rate) / u128::from(TICKS_PER_SEC);
    let accrued = u64::try_from(accrued).unwrap_or(u64::MAX);
    if accrued > 0 {
        *tokens = tokens.saturating_add(accrued).min(capacity);
        *last_tick = now_ticks;
    }
}

/// Rate-limits by packets per second; out of tokens means drop.
pub fn throttle(
    _packet: &[u8],
    _metadata: &PacketMetadata,
    now_ticks: u64,
    state: &mut RuleState,
    _result: &mut ActionResult,
) -> ActionMask {
    let RuleState::TokenBucket { counter, last_tick, tokens, rate, capacity } = state else {
        debug_assert!(false, "throttle evaluated with foreign state");
        return ActionMask::NONE;
    };
    refill(last_tick, tokens, *rate, *capacity, now_ticks);
    if *tokens > 0 {
        *tokens -= 1;
        *counter += 1;
        return ActionMask::NONE;
    }
    ActionMask::DROP
}

/// Rate-limits by bytes per second; a packet needs `len` tokens to pass.
pub fn bandwidth(
    packet: &[u8],
    _metadata: &PacketMetadata,
    now_ticks: u64,
    state: &mut RuleState,
    _result: &mut ActionResult,
) -> ActionMask {
    let RuleState::TokenBucket { counter, last_tick, tokens, rate, capacity } = state else {
        debug_assert!(false, "bandwidth evaluated with foreign state");
        return ActionMask::NONE;
    };
    refill(last_tick, tokens, *rate, *capacity, now_ticks);
    let cost = packet.len() as u64;
    if *tokens >= cost {
        *tokens -= cost;
        *counter += 1;
        return ActionMask::NONE;
    }
    ActionMask::DROP
}
