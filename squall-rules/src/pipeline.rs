use std::sync::Arc;

use arc_swap::ArcSwap;
use squall_capture::PacketMetadata;
use squall_common::now_ticks;

use crate::{action::ActionResult, ruleset::Ruleset, state::RuleState};

/// Holds the active [`Ruleset`] behind an atomic pointer.
///
/// `swap` never blocks `evaluate` and vice versa: readers load the pointer,
/// writers store a new one, and packets in flight finish against whichever
/// ruleset they loaded. Configuration code builds the replacement ruleset
/// entirely off the hot path.
#[derive(Debug)]
pub struct RulePipeline {
    current: ArcSwap<Ruleset>,
}

impl RulePipeline {
    /// Creates a pipeline with an empty ruleset (every packet passes).
    pub fn new() -> Self {
        Self { current: ArcSwap::from_pointee(Ruleset::empty()) }
    }

    /// Atomically replaces the active ruleset. Safe to call from any thread
    /// while workers evaluate concurrently; last writer wins.
    pub fn swap(&self, ruleset: Ruleset) {
        self.current.store(Arc::new(ruleset));
    }

    /// The currently active ruleset.
    pub fn current(&self) -> Arc<Ruleset> {
        self.current.load_full()
    }

    /// Creates an evaluation handle for one worker thread.
    pub fn handle(self: &Arc<Self>) -> PipelineHandle {
        let cached = self.current.load_full();
        let states = cached.states_cloned();
        PipelineHandle { pipeline: Arc::clone(self), cached, states }
    }
}

impl Default for RulePipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// One worker's view of the pipeline.
///
/// The handle owns a private clone of the active ruleset's states, re-cloned
/// lazily when it observes a swap (a pointer-identity check per packet).
/// This keeps rule-state mutation single-threaded by construction; the
/// trade-off is that stateful rules act per worker, so a throttle of N
/// packets/second admits up to `N × workers` aggregate across an engine's
/// capture lanes.
#[derive(Debug)]
pub struct PipelineHandle {
    pipeline: Arc<RulePipeline>,
    cached: Arc<Ruleset>,
    states: Box<[RuleState]>,
}

impl PipelineHandle {
    /// Evaluates the active ruleset against one packet at the current tick.
    #[inline]
    pub fn evaluate(&mut self, packet: &[u8], metadata: &PacketMetadata) -> ActionResult {
        self.evaluate_at(packet, metadata, now_ticks())
    }

    /// Evaluates at an explicit tick. Rules see `now_ticks` instead of
    /// reading the clock themselves, which keeps token buckets and burst
    /// gates deterministic under test.
    pub fn evaluate_at(
        &mut self,
        packet: &[u8],
        metadata: &PacketMetadata,
        now_ticks: u64,
    ) -> ActionResult {
        let current = self.pipeline.current.load();
        if !Arc::ptr_eq(&current, &self.cached) {
            // A swap happened: adopt the new ruleset and clone its states.
            // This is the only allocation evaluate can perform.
            self.cached = arc_swap::Guard::into_inner(current);
            self.states = self.cached.states_cloned();
        }

        if self.cached.capability().is_none() {
            return ActionResult::identity();
        }

        let mut result = ActionResult::identity();
        for (func, state) in self.cached.funcs().iter().zip(self.states.iter_mut()) {
            let mask = func(packet, metadata, now_ticks, state, &mut result);
            result.mask |= mask;
            if mask.short_circuits() {
                break;
            }
        }
        result
    }

    /// Per-rule counters of this worker's state clone, for diagnostics.
    pub fn rule_counters(&self) -> Vec<u64> {
        self.states.iter().map(RuleState::counter).collect()
    }
}
