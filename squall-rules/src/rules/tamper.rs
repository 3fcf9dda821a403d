use squall_capture::PacketMetadata;

use crate::{
    action::{ActionMask, ActionResult, ModifyFlags},
    state::RuleState,
};

/// State for [`tamper`]: which in-place modifications to request.
pub fn tamper_state(flags: ModifyFlags) -> RuleState {
    RuleState::Tamper { counter: 0, flags }
}

/// Requests byte-level modification of every packet. The rule only flags
/// intent; the actual rewriting and checksum repair happen at send time,
/// once, after all rules have voted.
pub fn tamper(
    _packet: &[u8],
    _metadata: &PacketMetadata,
    _now_ticks: u64,
    state: &mut RuleState,
    result: &mut ActionResult,
) -> ActionMask {
    let RuleState::Tamper { counter, flags } = state else {
        debug_assert!(false, "tamper evaluated with foreign state");
        return ActionMask::NONE;
    };
    if flags.is_none() {
        return ActionMask::NONE;
    }
    result.accumulate_modify(*flags);
    *counter += 1;
    ActionMask::MODIFY
}
