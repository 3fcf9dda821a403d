use squall_common::Xorshift32;

use crate::action::ModifyFlags;

/// Firing discipline of the TCP reset rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// Signal injection on every matching packet.
    Continuous,
    /// Signal once, then disarm.
    Armed,
    /// One-shot already fired; the rule is inert until reconfigured.
    Fired,
}

/// Per-rule scratch state, one variant per rule shape.
///
/// The original engine packed these into a 64-byte field overlay; a tagged
/// enum trades a few bytes for compile-checked field use (a rule can no
/// longer scribble over another shape's cursor). Each variant carries a
/// `counter` of packets the rule acted on.
///
/// A rule function handed a foreign variant treats the packet as
/// non-matching and returns [`crate::ActionMask::NONE`]; `debug_assert!`
/// catches the misconfiguration in debug builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleState {
    /// Drop / Blackhole / SynDrop: nothing to remember but the count.
    Stateless { counter: u64 },
    /// Throttle / Bandwidth token bucket.
    TokenBucket {
        counter: u64,
        /// Tick of the last refill.
        last_tick: u64,
        /// Tokens currently available (packets or bytes).
        tokens: u64,
        /// Tokens refilled per second.
        rate: u64,
        /// Bucket capacity.
        capacity: u64,
    },
    /// LossPattern cyclic bitmask.
    Pattern { counter: u64, mask: u64, cursor: u32, len: u32 },
    /// Jitter / OutOfOrder randomized delay.
    RandomDelay { counter: u64, rng: Xorshift32, min_ticks: u64, max_ticks: u64 },
    /// Lag / AckDelay fixed delay.
    FixedDelay { counter: u64, delay_ticks: u64 },
    /// Burst periodic gate.
    Gate {
        counter: u64,
        /// Tick at which the window last opened.
        last_open: u64,
        interval_ticks: u64,
    },
    /// Duplicate: extra copies per packet.
    Duplicate { counter: u64, copies: u32 },
    /// Tamper: which modifications to request.
    Tamper { counter: u64, flags: ModifyFlags },
    /// MtuClamp: maximum packet length.
    SizeClamp { counter: u64, max_len: u32 },
    /// WindowClamp: maximum TCP receive window.
    WindowClamp { counter: u64, max_window: u16 },
    /// TcpRst injection trigger.
    Reset { counter: u64, mode: ResetMode },
}

impl RuleState {
    /// Packets this rule has acted on.
    pub const fn counter(&self) -> u64 {
        match self {
            Self::Stateless { counter }
            | Self::TokenBucket { counter, .. }
            | Self::Pattern { counter, .. }
            | Self::RandomDelay { counter, .. }
            | Self::FixedDelay { counter, .. }
            | Self::Gate { counter, .. }
            | Self::Duplicate { counter, .. }
            | Self::Tamper { counter, .. }
            | Self::SizeClamp { counter, .. }
            | Self::WindowClamp { counter, .. }
            | Self::Reset { counter, .. } => *counter,
        }
    }
}
