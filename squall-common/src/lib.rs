#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod rng;
mod time;

pub use rng::Xorshift32;
pub use time::{ms_to_ticks, now_ticks, ticks_to_ms, TICKS_PER_MS, TICKS_PER_SEC};

#[allow(non_upper_case_globals)]
pub mod constants {
    pub const KiB: usize = 1024;
    pub const MiB: usize = 1024 * KiB;
}
