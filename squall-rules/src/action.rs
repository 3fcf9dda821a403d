use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Per-evaluation action flags returned by rule functions. `NONE` means pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionMask(u16);

impl ActionMask {
    /// No action: forward the packet untouched.
    pub const NONE: Self = Self(0);
    /// Drop the packet. Short-circuits the pipeline.
    pub const DROP: Self = Self(1 << 0);
    /// Silent drop, no response of any kind. Short-circuits the pipeline.
    pub const BLACKHOLE: Self = Self(1 << 1);
    /// Hold the packet and send it later.
    pub const DELAY: Self = Self(1 << 2);
    /// Send extra copies of the packet.
    pub const DUPLICATE: Self = Self(1 << 3);
    /// Rewrite packet bytes before sending.
    pub const MODIFY: Self = Self(1 << 4);
    /// Request a one-shot packet injection.
    pub const INJECT: Self = Self(1 << 5);

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is set in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when `self` and `other` share any bit.
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// True for the drop-category bits that terminate evaluation early.
    #[inline]
    pub const fn short_circuits(self) -> bool {
        self.0 & (Self::DROP.0 | Self::BLACKHOLE.0) != 0
    }
}

impl BitOr for ActionMask {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ActionMask {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ActionMask {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// Which in-place modifications to apply. OR-accumulated across rules,
/// independent of [`ActionMask::MODIFY`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifyFlags(u8);

impl ModifyFlags {
    pub const NONE: Self = Self(0);
    /// Truncate the packet to the configured maximum size.
    pub const TRUNCATE: Self = Self(1 << 0);
    /// Flip a payload byte.
    pub const CORRUPT: Self = Self(1 << 1);
    /// Zero the payload tail.
    pub const REWRITE: Self = Self(1 << 2);
    /// Clamp the TCP receive window.
    pub const WINDOW_CLAMP: Self = Self(1 << 3);
    /// Clamp the TCP MSS option.
    pub const MSS_CLAMP: Self = Self(1 << 4);

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ModifyFlags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ModifyFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Ruleset-wide categories, precomputed at build time so an idle pipeline
/// can skip evaluation entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleCapability(u16);

impl RuleCapability {
    pub const NONE: Self = Self(0);
    pub const DROP: Self = Self(1 << 0);
    pub const DELAY: Self = Self(1 << 1);
    pub const DUPLICATE: Self = Self(1 << 2);
    pub const MODIFY: Self = Self(1 << 3);
    pub const INJECT: Self = Self(1 << 4);

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for RuleCapability {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RuleCapability {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Accumulated verdict for one packet.
///
/// Rules never overwrite fields: flags are OR-ed, numeric fields take the
/// maximum, so the outcome is order-independent within a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionResult {
    /// OR of every rule's returned mask.
    pub mask: ActionMask,
    /// Largest requested delay, in clock ticks.
    pub delay_ticks: u64,
    /// Largest requested number of extra copies.
    pub duplicate_count: u32,
    /// OR of every rule's modify flags.
    pub modify_flags: ModifyFlags,
    /// Identifier of a prepared injection packet; −1 means none requested.
    pub inject_packet_id: i32,
}

impl ActionResult {
    /// The do-nothing verdict.
    #[inline]
    pub const fn identity() -> Self {
        Self {
            mask: ActionMask::NONE,
            delay_ticks: 0,
            duplicate_count: 0,
            modify_flags: ModifyFlags::NONE,
            inject_packet_id: -1,
        }
    }

    /// MAX-accumulates a delay request.
    #[inline]
    pub fn accumulate_delay(&mut self, ticks: u64) {
        if ticks > self.delay_ticks {
            self.delay_ticks = ticks;
        }
    }

    /// MAX-accumulates a duplicate request.
    #[inline]
    pub fn accumulate_duplicates(&mut self, copies: u32) {
        if copies > self.duplicate_count {
            self.duplicate_count = copies;
        }
    }

    /// OR-accumulates modify flags.
    #[inline]
    pub fn accumulate_modify(&mut self, flags: ModifyFlags) {
        self.modify_flags |= flags;
    }

    /// True once a drop-category bit is present.
    #[inline]
    pub const fn should_short_circuit(&self) -> bool {
        self.mask.short_circuits()
    }
}

impl Default for ActionResult {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_has_no_effect_bits() {
        let r = ActionResult::identity();
        assert!(r.mask.is_none());
        assert_eq!(r.delay_ticks, 0);
        assert_eq!(r.duplicate_count, 0);
        assert!(r.modify_flags.is_none());
        assert_eq!(r.inject_packet_id, -1);
    }

    #[test]
    fn numeric_fields_take_max() {
        let mut r = ActionResult::identity();
        r.accumulate_delay(50);
        r.accumulate_delay(10);
        assert_eq!(r.delay_ticks, 50);

        r.accumulate_duplicates(2);
        r.accumulate_duplicates(5);
        r.accumulate_duplicates(1);
        assert_eq!(r.duplicate_count, 5);
    }

    #[test]
    fn flags_are_ored() {
        let mut r = ActionResult::identity();
        r.accumulate_modify(ModifyFlags::CORRUPT);
        r.accumulate_modify(ModifyFlags::WINDOW_CLAMP);
        assert!(r.modify_flags.contains(ModifyFlags::CORRUPT | ModifyFlags::WINDOW_CLAMP));
    }

    #[test]
    fn short_circuit_on_drop_category_only() {
        let mut r = ActionResult::identity();
        r.mask |= ActionMask::DELAY | ActionMask::MODIFY;
        assert!(!r.should_short_circuit());
        r.mask |= ActionMask::BLACKHOLE;
        assert!(r.should_short_circuit());
    }

    #[test]
    fn mask_contains_and_intersects() {
        let m = ActionMask::DROP | ActionMask::DELAY;
        assert!(m.contains(ActionMask::DROP));
        assert!(!m.contains(ActionMask::DROP | ActionMask::MODIFY));
        assert!(m.intersects(ActionMask::DROP | ActionMask::MODIFY));
    }
}
