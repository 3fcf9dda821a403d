use squall_capture::PacketMetadata;

use crate::{
    action::{ActionMask, ActionResult},
    state::RuleState,
    tcp,
};

/// State for [`lag`]: a fixed delay applied to every packet.
pub fn lag_state(delay_ticks: u64) -> RuleState {
    RuleState::FixedDelay { counter: 0, delay_ticks }
}

/// State for [`ack_delay`]: a fixed delay applied to TCP ACKs only.
pub fn ack_delay_state(delay_ticks: u64) -> RuleState {
    RuleState::FixedDelay { counter: 0, delay_ticks }
}

/// State for [`burst`]: packets pass freely at the start of each interval
/// and queue up for the rest of it. The gate opens at `now_ticks`.
pub fn burst_state(interval_ticks: u64, now_ticks: u64) -> RuleState {
    RuleState::Gate { counter: 0, last_open: now_ticks, interval_ticks }
}

/// Delays every packet by a fixed amount.
pub fn lag(
    _packet: &[u8],
    _metadata: &PacketMetadata,
    _now_ticks: u64,
    state: &mut RuleState,
    result: &mut ActionResult,
) -> ActionMask {
    let RuleState::FixedDelay { counter, delay_ticks } = state else {
        debug_assert!(false, "lag evaluated with foreign state");
        return ActionMask::NONE;
    };
    if *delay_ticks == 0 {
        return ActionMask::NONE;
    }
    result.accumulate_delay(*delay_ticks);
    *counter += 1;
    ActionMask::DELAY
}

/// Delays TCP segments carrying the ACK flag; everything else passes
/// untouched. Slowing only the acknowledgement path throttles the peer's
/// send rate without touching the data packets themselves.
pub fn ack_delay(
    packet: &[u8],
    _metadata: &PacketMetadata,
    _now_ticks: u64,
    state: &mut RuleState,
    result: &mut ActionResult,
) -> ActionMask {
    let RuleState::FixedDelay { counter, delay_ticks } = state else {
        debug_assert!(false, "ack_delay evaluated with foreign state");
        return ActionMask::NONE;
    };
    if *delay_ticks == 0 {
        return ActionMask::NONE;
    }
    match tcp::tcp_flags(packet) {
        Some(flags) if flags & tcp::TCP_FLAG_ACK != 0 => {
            result.accumulate_delay(*delay_ticks);
            *counter += 1;
            ActionMask::DELAY
        }
        _ => ActionMask::NONE,
    }
}

/// Releases traffic in periodic bursts: the packet that finds the interval
/// elapsed opens a new window and passes immediately; packets arriving
/// inside the window are held until it ends, so they flush together.
pub fn burst(
    _packet: &[u8],
    _metadata: &PacketMetadata,
    now_ticks: u64,
    state: &mut RuleState,
    result: &mut ActionResult,
) -> ActionMask {
    let RuleState::Gate { counter, last_open, interval_ticks } = state else {
        debug_assert!(false, "burst evaluated with foreign state");
        return ActionMask::NONE;
    };
    let elapsed = now_ticks.saturating_sub(*last_open);
    if elapsed >= *interval_ticks {
        *last_open = now_ticks;
        return ActionMask::NONE;
    }
    result.accumulate_delay(*interval_ticks - elapsed);
    *counter += 1;
    ActionMask::DELAY
}
