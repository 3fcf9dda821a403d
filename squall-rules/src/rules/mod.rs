//! The built-in rule functions.
//!
//! All sixteen kinds are pure, allocation-free steps over
//! `(packet, metadata, now_ticks, own state, shared result)`. Drop-category
//! rules short-circuit the pipeline; everything else merges into the
//! accumulated [`crate::ActionResult`]. State constructors live next to
//! their rule and are called by [`crate::RulesetBuilder`] at configuration
//! time, never on the hot path.

mod bucket;
mod clamp;
mod delay;
mod drop;
mod duplicate;
mod pattern;
mod random;
mod reset;
mod tamper;

pub use bucket::{bandwidth, bandwidth_state, throttle, throttle_state};
pub use clamp::{mtu_clamp, mtu_clamp_state, window_clamp, window_clamp_state};
pub use delay::{ack_delay, ack_delay_state, burst, burst_state, lag, lag_state};
pub use drop::{blackhole, drop_all, stateless_state, syn_drop};
pub use duplicate::{duplicate, duplicate_state, MAX_DUPLICATES};
pub use pattern::{loss_pattern, loss_pattern_state, MAX_PATTERN_LEN};
pub use random::{jitter, jitter_state, out_of_order, out_of_order_state};
pub use reset::{tcp_rst, tcp_rst_state};
pub use tamper::{tamper, tamper_state};
