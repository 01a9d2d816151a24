//! Bortle scale classification.
//!
//! A smoothed lux value is mapped to a tier by scanning an ordered table of
//! inclusive upper bounds. Anything above the last bound is tier 9.

use heapless::Vec;

use crate::config::ConfigError;

/// Number of bounded tiers in a threshold table. Tier 9 is open ended.
pub const TABLE_LEN: usize = 8;

/// Field-tuned bounds for a VEML7700 pointed at the zenith.
pub const DEFAULT_THRESHOLDS: [(f32, u8); TABLE_LEN] = [
    (0.01, 1), // Excellent dark sky
    (0.08, 2),
    (0.3, 3),
    (1.0, 4),
    (4.0, 5),
    (10.0, 6),
    (30.0, 7),
    (100.0, 8),
];

/// A level on the Bortle scale, 1 (darkest) to 9 (brightest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BortleTier(u8);

impl BortleTier {
    pub const DARKEST: Self = Self(1);
    pub const BRIGHTEST: Self = Self(9);

    pub fn new(tier: u8) -> Option<Self> {
        (Self::DARKEST.0..=Self::BRIGHTEST.0)
            .contains(&tier)
            .then_some(Self(tier))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    /// Inclusive upper bound in lux
    pub lux: f32,
    pub tier: BortleTier,
}

/// Ordered lux bounds for tiers 1 to 8.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    entries: Vec<Threshold, TABLE_LEN>,
}

impl ThresholdTable {
    /// Build a table from `(upper_bound, tier)` pairs.
    ///
    /// The pairs must cover tiers 1 to 8 in order, with finite, non-negative
    /// and strictly increasing bounds.
    pub fn new(pairs: &[(f32, u8)]) -> Result<Self, ConfigError> {
        if pairs.len() != TABLE_LEN {
            return Err(ConfigError::TableLength);
        }
        let mut entries = Vec::new();
        let mut previous: Option<f32> = None;
        for (index, &(lux, tier)) in pairs.iter().enumerate() {
            if !lux.is_finite() || lux < 0.0 {
                return Err(ConfigError::BoundNotFinite);
            }
            if previous.map_or(false, |prev| lux <= prev) {
                return Err(ConfigError::BoundsNotIncreasing);
            }
            if usize::from(tier) != index + 1 {
                return Err(ConfigError::TierOutOfOrder);
            }
            entries
                .push(Threshold {
                    lux,
                    tier: BortleTier(tier),
                })
                .map_err(|_| ConfigError::TableLength)?;
            previous = Some(lux);
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[Threshold] {
        &self.entries
    }

    /// Map a smoothed lux value to its tier.
    ///
    /// A value equal to a bound belongs to that bound's tier. Negative
    /// (and NaN) input is clamped to zero.
    pub fn classify(&self, lux: f32) -> BortleTier {
        let lux = lux.max(0.0);
        self.entries
            .iter()
            .find(|threshold| lux <= threshold.lux)
            .map_or(BortleTier::BRIGHTEST, |threshold| threshold.tier)
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        let entries = DEFAULT_THRESHOLDS
            .iter()
            .map(|&(lux, tier)| Threshold {
                lux,
                tier: BortleTier(tier),
            })
            .collect();
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    macro_rules! assert_tier {
        ($table:expr, $lux:expr, $tier:expr) => {{
            assert_eq!(
                $table.classify($lux).get(),
                $tier,
                "classify({}) should be tier {}",
                $lux,
                $tier
            );
        }};
    }

    #[test]
    fn test_default_matches_constant_table() {
        assert_eq!(
            ThresholdTable::default(),
            ThresholdTable::new(&DEFAULT_THRESHOLDS).unwrap()
        );
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let table = ThresholdTable::default();
        assert_tier!(table, 0.01, 1);
        assert_tier!(table, 0.0100001, 2);
        assert_tier!(table, 100.0, 8);
        assert_tier!(table, 100.0001, 9);

        // Every bound belongs to its own tier, anything above to the next
        for threshold in table.entries() {
            let bound = threshold.lux;
            let above = f32::from_bits(bound.to_bits() + 1);
            assert_tier!(table, bound, threshold.tier.get());
            assert_tier!(table, above, threshold.tier.get() + 1);
        }
    }

    #[test]
    fn test_extremes() {
        let table = ThresholdTable::default();
        assert_tier!(table, 0.0, 1);
        assert_tier!(table, 120_000.0, 9);
        assert_tier!(table, f32::INFINITY, 9);
    }

    #[test]
    fn test_negative_is_clamped() {
        let table = ThresholdTable::default();
        assert_tier!(table, -5.0, 1);
        assert_tier!(table, f32::NAN, 1);
    }

    #[test]
    fn test_invalid_tables() {
        let mut pairs = DEFAULT_THRESHOLDS;
        assert_eq!(
            ThresholdTable::new(&pairs[..7]),
            Err(ConfigError::TableLength)
        );

        pairs[3].0 = pairs[2].0;
        assert_eq!(
            ThresholdTable::new(&pairs),
            Err(ConfigError::BoundsNotIncreasing)
        );

        let mut pairs = DEFAULT_THRESHOLDS;
        pairs[7].0 = f32::INFINITY;
        assert_eq!(
            ThresholdTable::new(&pairs),
            Err(ConfigError::BoundNotFinite)
        );

        let mut pairs = DEFAULT_THRESHOLDS;
        pairs.swap(4, 5);
        pairs[4].0 = 4.0;
        pairs[5].0 = 10.0;
        assert_eq!(
            ThresholdTable::new(&pairs),
            Err(ConfigError::TierOutOfOrder)
        );
    }

    #[test]
    fn test_tier_range() {
        assert!(BortleTier::new(0).is_none());
        assert!(BortleTier::new(10).is_none());
        assert_eq!(BortleTier::new(5).map(BortleTier::get), Some(5));
    }

    proptest! {
        #[test]
        fn prop_classify_is_monotonic(a in 0.0..200.0f32, b in 0.0..200.0f32) {
            let table = ThresholdTable::default();
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(table.classify(low) <= table.classify(high));
        }

        #[test]
        fn prop_classify_is_total(lux in 0.0..1.0e6f32) {
            let tier = ThresholdTable::default().classify(lux).get();
            prop_assert!((1..=9).contains(&tier));
        }
    }
}
