use squall_capture::PacketMetadata;

use crate::{
    action::{ActionMask, ActionResult},
    state::RuleState,
};

/// Longest expressible loss pattern, bounded by the u64 bitmask.
pub const MAX_PATTERN_LEN: u32 = 64;

/// State for [`loss_pattern`]. Bit `i` of `mask` set means "drop the packet
/// at position `i` of the cycle". `len` is clamped to `1..=64`.
pub fn loss_pattern_state(mask: u64, len: u32) -> RuleState {
    RuleState::Pattern { counter: 0, mask, cursor: 0, len: len.clamp(1, MAX_PATTERN_LEN) }
}

/// Drops packets following a cyclic bitmask, e.g. `0b1010`/4 drops cycle
/// positions 1 and 3 and passes 0 and 2, repeating every four packets.
pub fn loss_pattern(
    _packet: &[u8],
    _metadata: &PacketMetadata,
    _now_ticks: u64,
    state: &mut RuleState,
    _result: &mut ActionResult,
) -> ActionMask {
    let RuleState::Pattern { counter, mask, cursor, len } = state else {
        debug_assert!(false, "loss_pattern evaluated with foreign state");
        return ActionMask::NONE;
    };
    let should_drop = (*mask >> *cursor) & 1 == 1;
    *cursor = (*cursor + 1) % *len;
    *counter += 1;
    if should_drop {
        ActionMask::DROP
    } else {
        ActionMask::NONE
    }
}
