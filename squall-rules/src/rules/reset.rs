use squall_capture::PacketMetadata;

use crate::{
    action::{ActionMask, ActionResult},
    state::{ResetMode, RuleState},
    tcp,
};

/// State for [`tcp_rst`]. `one_shot` arms the rule for a single firing;
/// otherwise it signals on every matching packet.
pub fn tcp_rst_state(one_shot: bool) -> RuleState {
    let mode = if one_shot { ResetMode::Armed } else { ResetMode::Continuous };
    RuleState::Reset { counter: 0, mode }
}

/// Signals injection of a connection reset when a TCP packet passes.
///
/// The rule only raises the request and names the prepared injection slot;
/// the send path hands it to the inject queue after evaluation.
pub fn tcp_rst(
    packet: &[u8],
    _metadata: &PacketMetadata,
    _now_ticks: u64,
    state: &mut RuleState,
    result: &mut ActionResult,
) -> ActionMask {
    let RuleState::Reset { counter, mode } = state else {
        debug_assert!(false, "tcp_rst evaluated with foreign state");
        return ActionMask::NONE;
    };
    if *mode == ResetMode::Fired || !tcp::is_tcp(packet) {
        return ActionMask::NONE;
    }
    if *mode == ResetMode::Armed {
        *mode = ResetMode::Fired;
    }
    result.inject_packet_id = 0;
    *counter += 1;
    ActionMask::INJECT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tcp::testutil::{tcp_packet, udp_packet};
    use crate::tcp::TCP_FLAG_ACK;

    fn eval(packet: &[u8], state: &mut RuleState) -> (ActionMask, ActionResult) {
        let meta = PacketMetadata::default();
        let mut result = ActionResult::identity();
        let mask = tcp_rst(packet, &meta, 0, state, &mut result);
        (mask, result)
    }

    #[test]
    fn continuous_mode_fires_every_time() {
        let mut state = tcp_rst_state(false);
        let p = tcp_packet(TCP_FLAG_ACK, 1024, 0);
        for _ in 0..3 {
            let (mask, result) = eval(&p, &mut state);
            assert_eq!(mask, ActionMask::INJECT);
            assert_eq!(result.inject_packet_id, 0);
        }
        assert_eq!(state.counter(), 3);
    }

    #[test]
    fn one_shot_fires_once_then_goes_inert() {
        let mut state = tcp_rst_state(true);
        let p = tcp_packet(TCP_FLAG_ACK, 1024, 0);

        assert_eq!(eval(&p, &mut state).0, ActionMask::INJECT);
        assert_eq!(eval(&p, &mut state).0, ActionMask::NONE);
        assert_eq!(eval(&p, &mut state).0, ActionMask::NONE);
        assert_eq!(state.counter(), 1);
        assert_eq!(state, RuleState::Reset { counter: 1, mode: ResetMode::Fired });
    }

    #[test]
    fn non_tcp_does_not_trigger_or_disarm() {
        let mut state = tcp_rst_state(true);
        assert_eq!(eval(&udp_packet(8), &mut state).0, ActionMask::NONE);
        // Still armed for the next TCP packet.
        let p = tcp_packet(TCP_FLAG_ACK, 1024, 0);
        assert_eq!(eval(&p, &mut state).0, ActionMask::INJECT);
    }
}
