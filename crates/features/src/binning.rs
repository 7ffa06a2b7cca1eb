use serde::{Deserialize, Serialize};
use sc_core::{CoreError, Result, UNKNOWN_CODE};

/// Fixed age boundaries. Bins are right-open except the last, which includes 100.
pub const AGE_EDGES: [u32; 5] = [0, 25, 35, 50, 100];

pub const PRICE_TIER_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeSegment {
    Young,
    Adult,
    Middle,
    Senior,
}

impl AgeSegment {
    const ORDER: [AgeSegment; 4] =
        [AgeSegment::Young, AgeSegment::Adult, AgeSegment::Middle, AgeSegment::Senior];

    pub fn from_age(age: u32) -> Option<Self> {
        let last = AGE_EDGES.len() - 1;
        if age > AGE_EDGES[last] {
            return None;
        }
        let bin = AGE_EDGES[1..last]
            .iter()
            .position(|&upper| age < upper)
            .unwrap_or(last - 1);
        Some(Self::ORDER[bin])
    }

    pub fn code(self) -> i64 {
        self as i64
    }
}

pub fn age_segment_code(age: u32) -> i64 {
    AgeSegment::from_age(age).map_or(UNKNOWN_CODE, AgeSegment::code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceTier {
    Budget,
    Low,
    Mid,
    High,
    Premium,
}

impl PriceTier {
    const ORDER: [PriceTier; PRICE_TIER_COUNT] =
        [PriceTier::Budget, PriceTier::Low, PriceTier::Mid, PriceTier::High, PriceTier::Premium];

    pub fn code(self) -> i64 {
        self as i64
    }
}

/// Where price-tier edges come from when encoding a batch against a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTierMode {
    /// Reuse the edges computed once from the training reference.
    #[default]
    Reference,
    /// Recompute edges from the min/max of each batch being encoded.
    PerBatch,
}

/// Five equal-width price bins. Bins are right-closed and the lowest edge is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceTierEdges {
    edges: [f64; PRICE_TIER_COUNT + 1],
}

impl PriceTierEdges {
    pub fn from_prices(prices: impl IntoIterator<Item = f64>) -> Result<Self> {
        let (min, max) = prices
            .into_iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p), hi.max(p)));
        if !min.is_finite() || !max.is_finite() {
            let reason = "cannot bin prices of an empty or non-numeric batch";
            return Err(CoreError::Data(reason.into()));
        }
        Ok(Self::from_range(min, max))
    }

    pub fn from_range(min: f64, max: f64) -> Self {
        let (lo, hi) = if min == max {
            // Widen a single-valued range so it lands in the middle tier.
            let pad = |v: f64| if v == 0.0 { 0.001 } else { 0.001 * v.abs() };
            (min - pad(min), max + pad(max))
        } else {
            (min, max)
        };
        let width = (hi - lo) / PRICE_TIER_COUNT as f64;
        let mut edges = [0.0; PRICE_TIER_COUNT + 1];
        for (i, edge) in edges.iter_mut().enumerate() {
            *edge = lo + width * i as f64;
        }
        edges[PRICE_TIER_COUNT] = hi;
        Self { edges }
    }

    /// Prices outside the edges clamp to the first or last tier.
    pub fn tier(&self, price: f64) -> PriceTier {
        let bin = self.edges[1..]
            .iter()
            .position(|&upper| price <= upper)
            .unwrap_or(PRICE_TIER_COUNT - 1);
        PriceTier::ORDER[bin]
    }

    pub fn edges(&self) -> &[f64; PRICE_TIER_COUNT + 1] {
        &self.edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_bins_are_right_open_with_inclusive_upper_bound() {
        assert_eq!(age_segment_code(0), 0);
        assert_eq!(age_segment_code(24), 0);
        assert_eq!(age_segment_code(25), 1);
        assert_eq!(age_segment_code(34), 1);
        assert_eq!(age_segment_code(35), 2);
        assert_eq!(age_segment_code(49), 2);
        assert_eq!(age_segment_code(50), 3);
        assert_eq!(age_segment_code(100), 3);
        assert_eq!(age_segment_code(101), UNKNOWN_CODE);
    }

    #[test]
    fn price_tiers_split_the_range_into_equal_widths() {
        let edges = PriceTierEdges::from_range(100.0, 600.0);
        assert_eq!(edges.edges(), &[100.0, 200.0, 300.0, 400.0, 500.0, 600.0]);
        assert_eq!(edges.tier(100.0), PriceTier::Budget);
        assert_eq!(edges.tier(200.0), PriceTier::Budget);
        assert_eq!(edges.tier(200.5), PriceTier::Low);
        assert_eq!(edges.tier(350.0), PriceTier::Mid);
        assert_eq!(edges.tier(450.0), PriceTier::High);
        assert_eq!(edges.tier(600.0), PriceTier::Premium);
    }

    #[test]
    fn out_of_range_prices_clamp() {
        let edges = PriceTierEdges::from_range(100.0, 600.0);
        assert_eq!(edges.tier(50.0), PriceTier::Budget);
        assert_eq!(edges.tier(5000.0), PriceTier::Premium);
    }

    #[test]
    fn single_valued_range_lands_in_the_middle_tier() {
        let edges = PriceTierEdges::from_prices([500.0, 500.0]).unwrap();
        assert_eq!(edges.tier(500.0), PriceTier::Mid);
        let zero = PriceTierEdges::from_range(0.0, 0.0);
        assert_eq!(zero.tier(0.0), PriceTier::Mid);
    }

    #[test]
    fn empty_batch_cannot_be_binned() {
        assert!(PriceTierEdges::from_prices(Vec::<f64>::new()).is_err());
    }
}
