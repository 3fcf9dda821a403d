#![doc(issue_tracker_base_url = "https://github.com/squall-rs/squall/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Squall reproduces adverse network conditions by intercepting packets and
//! running each one through a hot-swappable pipeline of shaping rules:
//! drop, throttle, delay, jitter, reorder, duplicate, tamper, clamp and
//! reset injection.
//!
//! The crates underneath:
//! - `squall-capture`: the capture provider abstraction, packet metadata
//!   and checksum primitives, plus an in-process loopback provider.
//! - `squall-rules`: the rule pipeline, the sixteen rule kinds, the send
//!   decorator, the time-wheel scheduler and the inject queue.
//! - `squall-engine`: the multi-threaded capture session and telemetry.
//!
//! ```no_run
//! use std::sync::Arc;
//! use squall::{
//!     CaptureEngine, MemoryCapture, RuleConfig, RulesetBuilder,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let capture = Arc::new(MemoryCapture::new());
//! let handle = Arc::clone(&capture);
//! let engine = CaptureEngine::new(move || Arc::clone(&handle));
//!
//! engine.swap(
//!     RulesetBuilder::new()
//!         .rule(RuleConfig::Lag { delay_ms: 100 })?
//!         .rule(RuleConfig::Jitter { min_ms: 0, max_ms: 50, seed: None })?
//!         .build()?,
//! );
//!
//! engine.start("outbound and tcp")?;
//! // ... traffic now crosses the rules ...
//! engine.stop();
//! # Ok(())
//! # }
//! ```

pub use squall_capture::*;
pub use squall_common as common;
pub use squall_engine::*;
pub use squall_rules::*;
