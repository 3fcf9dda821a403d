use squall_capture::PacketMetadata;

use crate::{
    action::{ActionMask, ActionResult, RuleCapability},
    builder::RulesetError,
    state::RuleState,
};

/// A rule evaluation step.
///
/// Plain function pointers, never closures: all mutable state a rule may
/// touch lives in its [`RuleState`]. `now_ticks` is sampled once per packet
/// by the pipeline. Rules return their own mask (the pipeline ORs it into
/// the result) and use the accumulate methods on [`ActionResult`] for
/// numeric fields.
pub type RuleFn = fn(
    packet: &[u8],
    metadata: &PacketMetadata,
    now_ticks: u64,
    state: &mut RuleState,
    result: &mut ActionResult,
) -> ActionMask;

/// An immutable, ordered set of shaping rules.
///
/// Function and state arrays are index-aligned. Built off the hot path by
/// [`crate::RulesetBuilder`]; workers receive it through
/// [`crate::RulePipeline::swap`] and clone only the state array.
#[derive(Debug)]
pub struct Ruleset {
    funcs: Box<[RuleFn]>,
    states: Box<[RuleState]>,
    capability: RuleCapability,
}

impl Ruleset {
    /// A ruleset with no rules and no capabilities.
    pub fn empty() -> Self {
        Self { funcs: Box::new([]), states: Box::new([]), capability: RuleCapability::NONE }
    }

    pub(crate) fn new(
        funcs: Vec<RuleFn>,
        states: Vec<RuleState>,
        capability: RuleCapability,
    ) -> Result<Self, RulesetError> {
        if funcs.len() != states.len() {
            return Err(RulesetError::LengthMismatch { funcs: funcs.len(), states: states.len() });
        }
        Ok(Self { funcs: funcs.into(), states: states.into(), capability })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    #[inline]
    pub const fn capability(&self) -> RuleCapability {
        self.capability
    }

    #[inline]
    pub(crate) fn funcs(&self) -> &[RuleFn] {
        &self.funcs
    }

    /// Snapshot of the initial per-rule states, cloned for one worker.
    pub(crate) fn states_cloned(&self) -> Box<[RuleState]> {
        self.states.clone()
    }
}
