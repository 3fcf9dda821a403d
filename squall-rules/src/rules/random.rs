use squall_capture::PacketMetadata;
use squall_common::Xorshift32;

use crate::{
    action::{ActionMask, ActionResult},
    state::RuleState,
};

/// State for [`jitter`]: each packet draws a delay from `[min, max]` ticks.
pub fn jitter_state(min_ticks: u64, max_ticks: u64, seed: u32) -> RuleState {
    RuleState::RandomDelay { counter: 0, rng: Xorshift32::new(seed), min_ticks, max_ticks }
}

/// State for [`out_of_order`]: each packet draws a delay from `[0, max]`
/// ticks, so some packets pass immediately and overtake delayed ones.
pub fn out_of_order_state(max_ticks: u64, seed: u32) -> RuleState {
    RuleState::RandomDelay { counter: 0, rng: Xorshift32::new(seed), min_ticks: 0, max_ticks }
}

/// Delays every packet by a random amount within the configured range.
pub fn jitter(
    _packet: &[u8],
    _metadata: &PacketMetadata,
    _now_ticks: u64,
    state: &mut RuleState,
    result: &mut ActionResult,
) -> ActionMask {
    let RuleState::RandomDelay { counter, rng, min_ticks, max_ticks } = state else {
        debug_assert!(false, "jitter evaluated with foreign state");
        return ActionMask::NONE;
    };
    let delay = rng.next_range(*min_ticks, *max_ticks);
    result.accumulate_delay(delay);
    *counter += 1;
    ActionMask::DELAY
}

/// Reorders traffic by randomly delaying a fraction of packets. A draw of
/// zero passes the packet straight through, and the held packets surface
/// behind whatever came after them.
pub fn out_of_order(
    _packet: &[u8],
    _metadata: &PacketMetadata,
    _now_ticks: u64,
    state: &mut RuleState,
    result: &mut ActionResult,
) -> ActionMask {
    let RuleState::RandomDelay { counter, rng, min_ticks, max_ticks } = state else {
        debug_assert!(false, "out_of_order evaluated with foreign state");
        return ActionMask::NONE;
    };
    let delay = rng.next_range(*min_ticks, *max_ticks);
    if delay == 0 {
        return ActionMask::NONE;
    }
    result.accumulate_delay(delay);
    *counter += 1;
    ActionMask::DELAY
}
