use squall_common::{ms_to_ticks, now_ticks};

use crate::{
    action::{ModifyFlags, RuleCapability},
    rules,
    ruleset::{RuleFn, Ruleset},
    state::RuleState,
    wheel::{TICKS_PER_SLOT, WHEEL_SLOTS},
};

/// Longest delay any rule may request, bounded by the scheduler horizon.
/// A delay at or past the horizon would wrap onto a slot that fires early.
const MAX_DELAY_TICKS: u64 = WHEEL_SLOTS as u64 * TICKS_PER_SLOT;

/// Declarative description of one shaping rule, consumed by
/// [`RulesetBuilder`]. Durations are milliseconds; `seed: None` draws a
/// fresh seed so repeated builds do not replay the same delay sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleConfig {
    /// Drop every packet.
    Drop,
    /// Drop every packet silently.
    Blackhole,
    /// Drop bare TCP SYNs, blocking new connections.
    SynDrop,
    /// Pass at most this many packets per second.
    Throttle { packets_per_sec: u32 },
    /// Pass at most this many bytes per second.
    Bandwidth { bytes_per_sec: u32 },
    /// Drop following a cyclic bitmask of `len` positions.
    LossPattern { mask: u64, len: u32 },
    /// Delay every packet by a fixed amount.
    Lag { delay_ms: u32 },
    /// Delay TCP ACKs by a fixed amount.
    AckDelay { delay_ms: u32 },
    /// Release traffic in bursts, one window per interval.
    Burst { interval_ms: u32 },
    /// Delay every packet by a random amount in `[min_ms, max_ms]`.
    Jitter { min_ms: u32, max_ms: u32, seed: Option<u32> },
    /// Randomly delay packets in `[0, max_ms]` so later ones overtake.
    OutOfOrder { max_ms: u32, seed: Option<u32> },
    /// Send this many extra copies of every packet.
    Duplicate { copies: u32 },
    /// Rewrite packet bytes in place.
    Tamper { flags: ModifyFlags },
    /// Truncate packets longer than this.
    MtuClamp { max_len: u32 },
    /// Clamp the advertised TCP receive window.
    WindowClamp { max_window: u16 },
    /// Signal a connection-reset injection on TCP traffic.
    TcpRst { one_shot: bool },
}

/// Rejected rule configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RulesetError {
    #[error("function and state arrays differ in length ({funcs} vs {states})")]
    LengthMismatch { funcs: usize, states: usize },
    #[error("delay of {requested_ms} ms exceeds the scheduler horizon of {max_ms} ms")]
    DelayTooLong { requested_ms: u32, max_ms: u32 },
    #[error("loss pattern length {len} outside 1..={max}", max = rules::MAX_PATTERN_LEN)]
    PatternLength { len: u32 },
    #[error("delay range is inverted ({min_ms} ms > {max_ms} ms)")]
    InvertedRange { min_ms: u32, max_ms: u32 },
    #[error("rate of zero would drop everything; use a drop rule instead")]
    ZeroRate,
}

/// Assembles a validated [`Ruleset`] off the hot path.
///
/// Rules evaluate in insertion order, so drop-category rules placed first
/// short-circuit the rest. The builder also folds each rule's category into
/// the ruleset [`RuleCapability`], which lets an idle pipeline skip
/// evaluation entirely.
#[derive(Debug, Default)]
pub struct RulesetBuilder {
    funcs: Vec<RuleFn>,
    states: Vec<RuleState>,
    capability: RuleCapability,
}

impl RulesetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one rule, validating its parameters.
    pub fn rule(mut self, config: RuleConfig) -> Result<Self, RulesetError> {
        let (func, state, capability) = Self::compile(config, now_ticks())?;
        self.funcs.push(func);
        self.states.push(state);
        self.capability |= capability;
        Ok(self)
    }

    /// Number of rules added so far.
    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    pub fn build(self) -> Result<Ruleset, RulesetError> {
        Ruleset::new(self.funcs, self.states, self.capability)
    }

    fn compile(
        config: RuleConfig,
        now_ticks: u64,
    ) -> Result<(RuleFn, RuleState, RuleCapability), RulesetError> {
        let compiled = match config {
            RuleConfig::Drop => {
                (rules::drop_all as RuleFn, rules::stateless_state(), RuleCapability::DROP)
            }
            RuleConfig::Blackhole => {
                (rules::blackhole as RuleFn, rules::stateless_state(), RuleCapability::DROP)
            }
            RuleConfig::SynDrop => {
                (rules::syn_drop as RuleFn, rules::stateless_state(), RuleCapability::DROP)
            }
            RuleConfig::Throttle { packets_per_sec } => {
                if packets_per_sec == 0 {
                    return Err(RulesetError::ZeroRate);
                }
                (
                    rules::throttle as RuleFn,
                    rules::throttle_state(packets_per_sec, now_ticks),
                    RuleCapability::DROP,
                )
            }
            RuleConfig::Bandwidth { bytes_per_sec } => {
                if bytes_per_sec == 0 {
                    return Err(RulesetError::ZeroRate);
                }
                (
                    rules::bandwidth as RuleFn,
                    rules::bandwidth_state(bytes_per_sec, now_ticks),
                    RuleCapability::DROP,
                )
            }
            RuleConfig::LossPattern { mask, len } => {
                if len == 0 || len > rules::MAX_PATTERN_LEN {
                    return Err(RulesetError::PatternLength { len });
                }
                (
                    rules::loss_pattern as RuleFn,
                    rules::loss_pattern_state(mask, len),
                    RuleCapability::DROP,
                )
            }
            RuleConfig::Lag { delay_ms } => (
                rules::lag as RuleFn,
                rules::lag_state(checked_delay(delay_ms)?),
                RuleCapability::DELAY,
            ),
            RuleConfig::AckDelay { delay_ms } => (
                rules::ack_delay as RuleFn,
                rules::ack_delay_state(checked_delay(delay_ms)?),
                RuleCapability::DELAY,
            ),
            RuleConfig::Burst { interval_ms } => (
                rules::burst as RuleFn,
                rules::burst_state(checked_delay(interval_ms)?, now_ticks),
                RuleCapability::DELAY,
            ),
            RuleConfig::Jitter { min_ms, max_ms, seed } => {
                if min_ms > max_ms {
                    return Err(RulesetError::InvertedRange { min_ms, max_ms });
                }
                (
                    rules::jitter as RuleFn,
                    rules::jitter_state(
                        ms_to_ticks(u64::from(min_ms)),
                        checked_delay(max_ms)?,
                        seed.unwrap_or_else(rand::random),
                    ),
                    RuleCapability::DELAY,
                )
            }
            RuleConfig::OutOfOrder { max_ms, seed } => (
                rules::out_of_order as RuleFn,
                rules::out_of_order_state(checked_delay(max_ms)?, seed.unwrap_or_else(rand::random)),
                RuleCapability::DELAY,
            ),
            RuleConfig::Duplicate { copies } => (
                rules::duplicate as RuleFn,
                rules::duplicate_state(copies),
                RuleCapability::DUPLICATE,
            ),
            RuleConfig::Tamper { flags } => {
                (rules::tamper as RuleFn, rules::tamper_state(flags), RuleCapability::MODIFY)
            }
            RuleConfig::MtuClamp { max_len } => (
                rules::mtu_clamp as RuleFn,
                rules::mtu_clamp_state(max_len),
                RuleCapability::MODIFY,
            ),
            RuleConfig::WindowClamp { max_window } => (
                rules::window_clamp as RuleFn,
                rules::window_clamp_state(max_window),
                RuleCapability::MODIFY,
            ),
            RuleConfig::TcpRst { one_shot } => {
                (rules::tcp_rst as RuleFn, rules::tcp_rst_state(one_shot), RuleCapability::INJECT)
            }
        };
        Ok(compiled)
    }
}

/// Converts a millisecond delay to ticks, rejecting values the scheduler
/// cannot represent.
fn checked_delay(delay_ms: u32) -> Result<u64, RulesetError> {
    let ticks = ms_to_ticks(u64::from(delay_ms));
    if ticks >= MAX_DELAY_TICKS {
        let max_ms = (MAX_DELAY_TICKS / squall_common::TICKS_PER_MS) as u32 - 1;
        return Err(RulesetError::DelayTooLong { requested_ms: delay_ms, max_ms });
    }
    Ok(ticks)
}
