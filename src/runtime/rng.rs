// =============================================================================
// Random number generation for `rand`
// =============================================================================

// LCG constants (Knuth, MMIX)
const LCG_MULTIPLIER: u64 = 6364136223846793005;
const LCG_INCREMENT: u64 = 1442695040888963407;

/// Deterministic 64-bit linear congruential generator.
///
/// Owned by one VM; two VMs built with the same seed produce the same
/// sequence of `rand` results.
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Get the next random u64, advancing the state.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT);
        self.state
    }

    /// Random f32 in [0, 1), built from the 24 high bits.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u32 << 24) as f32
    }

    /// Random f32 in [lo, hi).
    ///
    /// An empty or reversed range yields `lo`.
    pub fn range(&mut self, lo: f32, hi: f32) -> f32 {
        if !(hi > lo) {
            return lo;
        }
        let value = lo + (hi - lo) * self.next_f32();
        // rounding can land exactly on `hi`
        if value < hi { value } else { lo }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = Lcg::new(42);
        let mut b = Lcg::new(42);
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = Lcg::new(1);
        let mut b = Lcg::new(2);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn test_unit_interval() {
        let mut rng = Lcg::new(7);
        for _ in 0..10_000 {
            let x = rng.next_f32();
            assert!((0.0..1.0).contains(&x), "{} out of [0, 1)", x);
        }
    }

    #[test]
    fn test_range_is_half_open() {
        let mut rng = Lcg::new(99);
        for _ in 0..10_000 {
            let x = rng.range(-2.0, 3.0);
            assert!((-2.0..3.0).contains(&x), "{} out of [-2, 3)", x);
        }
    }

    #[test]
    fn test_degenerate_range() {
        let mut rng = Lcg::new(0);
        assert_eq!(rng.range(4.0, 4.0), 4.0);
        assert_eq!(rng.range(5.0, 1.0), 5.0);
        assert!(rng.range(f32::NAN, 1.0).is_nan());
    }
}
