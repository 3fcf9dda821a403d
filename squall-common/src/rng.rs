/// Allocation-free xorshift32 PRNG.
///
/// Used by the randomized delay rules, where one PRNG step per packet must
/// cost a handful of shifts and xors. Not suitable for anything needing
/// statistical quality beyond "spread delays around".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Xorshift32 {
    state: u32,
}

impl Xorshift32 {
    /// Creates a generator from a seed. A zero seed would get the generator
    /// stuck, so it is replaced with a fixed non-zero constant.
    #[inline]
    pub const fn new(seed: u32) -> Self {
        Self { state: if seed == 0 { 0x9E37_79B9 } else { seed } }
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Returns a value uniformly distributed in `[lo, hi]` (inclusive).
    #[inline]
    pub fn next_range(&mut self, lo: u64, hi: u64) -> u64 {
        debug_assert!(lo <= hi);
        let span = hi - lo + 1;
        lo + u64::from(self.next_u32()) % span
    }
}
