use squall_capture::PacketMetadata;

use crate::{
    action::{ActionMask, ActionResult, ModifyFlags},
    state::RuleState,
};

/// State for [`mtu_clamp`]: maximum packet length in bytes.
pub fn mtu_clamp_state(max_len: u32) -> RuleState {
    RuleState::SizeClamp { counter: 0, max_len }
}

/// State for [`window_clamp`]: maximum advertised TCP receive window.
pub fn window_clamp_state(max_window: u16) -> RuleState {
    RuleState::WindowClamp { counter: 0, max_window }
}

/// Flags oversized packets for truncation at send time.
pub fn mtu_clamp(
    packet: &[u8],
    _metadata: &PacketMetadata,
    _now_ticks: u64,
    state: &mut RuleState,
    result: &mut ActionResult,
) -> ActionMask {
    let RuleState::SizeClamp { counter, max_len } = state else {
        debug_assert!(false, "mtu_clamp evaluated with foreign state");
        return ActionMask::NONE;
    };
    if packet.len() <= *max_len as usize {
        return ActionMask::NONE;
    }
    result.accumulate_modify(ModifyFlags::TRUNCATE);
    *counter += 1;
    ActionMask::MODIFY
}

/// Flags TCP segments advertising a window larger than the limit, forcing
/// the peer into smaller sends.
pub fn window_clamp(
    packet: &[u8],
    _metadata: &PacketMetadata,
    _now_ticks: u64,
    state: &mut RuleState,
    result: &mut ActionResult,
) -> ActionMask {
    let RuleState::WindowClamp { counter, max_window } = state else {
        debug_assert!(false, "window_clamp evaluated with foreign state");
        return ActionMask::NONE;
    };
    match crate::tcp::tcp_window(packet) {
        Some(window) if window > *max_window => {
            result.accumulate_modify(ModifyFlags::WINDOW_CLAMP);
            *counter += 1;
            ActionMask::MODIFY
        }
        _ => ActionMask::NONE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tcp::testutil::{tcp_packet, udp_packet};
    use crate::tcp::TCP_FLAG_ACK;

    fn eval(rule: crate::RuleFn, packet: &[u8], state: &mut RuleState) -> (ActionMask, ActionResult) {
        let meta = PacketMetadata::default();
        let mut result = ActionResult::identity();
        let mask = rule(packet, &meta, 0, state, &mut result);
        (mask, result)
    }

    #[test]
    fn mtu_clamp_flags_only_oversized() {
        let mut state = mtu_clamp_state(100);
        let (mask, result) = eval(mtu_clamp, &[0u8; 150], &mut state);
        assert_eq!(mask, ActionMask::MODIFY);
        assert!(result.modify_flags.contains(ModifyFlags::TRUNCATE));

        assert_eq!(eval(mtu_clamp, &[0u8; 100], &mut state).0, ActionMask::NONE);
        assert_eq!(eval(mtu_clamp, &[0u8; 40], &mut state).0, ActionMask::NONE);
        assert_eq!(state.counter(), 1);
    }

    #[test]
    fn window_clamp_flags_only_large_windows() {
        let mut state = window_clamp_state(1_024);
        let wide = tcp_packet(TCP_FLAG_ACK, 8_192, 0);
        let narrow = tcp_packet(TCP_FLAG_ACK, 512, 0);

        let (mask, result) = eval(window_clamp, &wide, &mut state);
        assert_eq!(mask, ActionMask::MODIFY);
        assert!(result.modify_flags.contains(ModifyFlags::WINDOW_CLAMP));

        assert_eq!(eval(window_clamp, &narrow, &mut state).0, ActionMask::NONE);
        assert_eq!(state.counter(), 1);
    }

    #[test]
    fn window_clamp_ignores_non_tcp() {
        let mut state = window_clamp_state(1);
        assert_eq!(eval(window_clamp, &udp_packet(16), &mut state).0, ActionMask::NONE);
    }
}
