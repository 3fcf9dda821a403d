use squall_capture::PacketMetadata;

use crate::{
    action::{ActionMask, ActionResult},
    state::RuleState,
    tcp,
};

/// State for the stateless drop rules.
pub fn stateless_state() -> RuleState {
    RuleState::Stateless { counter: 0 }
}

#[inline]
fn bump(state: &mut RuleState) {
    if let RuleState::Stateless { counter } = state {
        *counter += 1;
    } else {
        debug_assert!(false, "stateless rule evaluated with foreign state");
    }
}

/// Drops every packet.
pub fn drop_all(
    _packet: &[u8],
    _metadata: &PacketMetadata,
    _now_ticks: u64,
    state: &mut RuleState,
    _result: &mut ActionResult,
) -> ActionMask {
    bump(state);
    ActionMask::DROP
}

/// Drops every packet silently (no response of any kind).
pub fn blackhole(
    _packet: &[u8],
    _metadata: &PacketMetadata,
    _now_ticks: u64,
    state: &mut RuleState,
    _result: &mut ActionResult,
) -> ActionMask {
    bump(state);
    ActionMask::BLACKHOLE
}

/// Drops TCP SYN-without-ACK packets, blocking new connections while
/// leaving established flows alone.
pub fn syn_drop(
    packet: &[u8],
    _metadata: &PacketMetadata,
    _now_ticks: u64,
    state: &mut RuleState,
    _result: &mut ActionResult,
) -> ActionMask {
    let Some(flags) = tcp::tcp_flags(packet) else {
        return ActionMask::NONE;
    };
    if flags & tcp::TCP_FLAG_SYN != 0 && flags & tcp::TCP_FLAG_ACK == 0 {
        bump(state);
        return ActionMask::DROP;
    }
    ActionMask::NONE
}
