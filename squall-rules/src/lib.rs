#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! The shaping core: a hot-swappable pipeline of rule functions that decide,
//! per packet, whether to drop, delay, duplicate, modify or inject, plus the
//! machinery that carries those decisions out (the [`ShapedCapture`] send
//! decorator, the [`TimeWheelScheduler`] for delayed dispatch and the
//! [`InjectQueue`] for one-shot injection).

mod action;
mod builder;
mod inject;
mod pipeline;
mod ruleset;
mod shaped;
mod state;
mod tcp;
mod wheel;

pub mod rules;

pub use action::{ActionMask, ActionResult, ModifyFlags, RuleCapability};
pub use builder::{RuleConfig, RulesetBuilder, RulesetError};
pub use inject::{InjectQueue, INJECT_QUEUE_CAPACITY};
pub use pipeline::{PipelineHandle, RulePipeline};
pub use ruleset::{RuleFn, Ruleset};
pub use shaped::{ShapedCapture, MAX_MODIFY_LEN};
pub use state::{ResetMode, RuleState};
pub use wheel::{TimeWheelScheduler, TICKS_PER_SLOT, WHEEL_SLOTS};
