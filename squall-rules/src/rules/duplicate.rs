use squall_capture::PacketMetadata;

use crate::{
    action::{ActionMask, ActionResult},
    state::RuleState,
};

/// Most extra copies a single rule can request per packet.
pub const MAX_DUPLICATES: u32 = 16;

/// State for [`duplicate`]: `copies` extra transmissions per packet,
/// clamped to [`MAX_DUPLICATES`].
pub fn duplicate_state(copies: u32) -> RuleState {
    RuleState::Duplicate { counter: 0, copies: copies.min(MAX_DUPLICATES) }
}

/// Requests extra copies of every packet. Copies go out immediately even
/// when the original is also delayed, which mimics the reordered arrivals
/// real duplication produces.
pub fn duplicate(
    _packet: &[u8],
    _metadata: &PacketMetadata,
    _now_ticks: u64,
    state: &mut RuleState,
    result: &mut ActionResult,
) -> ActionMask {
    let RuleState::Duplicate { counter, copies } = state else {
        debug_assert!(false, "duplicate evaluated with foreign state");
        return ActionMask::NONE;
    };
    if *copies == 0 {
        return ActionMask::NONE;
    }
    result.accumulate_duplicates(*copies);
    *counter += 1;
    ActionMask::DUPLICATE
}
