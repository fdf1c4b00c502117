//! Loading-time formula.
//!
//! `total_cranes = Σ cranes × ships_count`;
//! `loading_time = (containers_20ft × 2 + containers_40ft × 3) / total_cranes`,
//! or `0.0` when there is no crane capacity at all.

use tracing::debug;

use super::model::{CalculationInput, CraneRecord};

/// Time units needed to move one 20ft container.
pub const TWENTY_FOOT_COST: f64 = 2.0;
/// Time units needed to move one 40ft container.
pub const FORTY_FOOT_COST: f64 = 3.0;

/// Combined crane capacity of all listed ships.
#[must_use]
pub fn total_cranes(records: &[CraneRecord]) -> f64 {
    records
        .iter()
        .map(|r| f64::from(r.cranes) * f64::from(r.ships_count))
        .sum()
}

/// Estimated loading time; zero capacity yields `0.0` rather than a division fault.
#[must_use]
pub fn compute(containers_20ft: u32, containers_40ft: u32, records: &[CraneRecord]) -> f64 {
    let cranes = total_cranes(records);
    if cranes <= 0.0 {
        return 0.0;
    }

    let container_time = f64::from(containers_20ft) * TWENTY_FOOT_COST
        + f64::from(containers_40ft) * FORTY_FOOT_COST;
    container_time / cranes
}

/// Produces the loading-time figure for validated input.
///
/// The runner only talks to this trait, so the estimation strategy can be
/// swapped without touching scheduling or delivery.
pub trait LoadingTimeEstimator: Send + Sync {
    fn estimate(&self, input: &CalculationInput<'_>) -> f64;
}

/// Default estimator backed by [`compute`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CraneCapacityEstimator;

impl LoadingTimeEstimator for CraneCapacityEstimator {
    fn estimate(&self, input: &CalculationInput<'_>) -> f64 {
        let value = compute(input.containers_20ft, input.containers_40ft, input.ships);
        debug!(
            containers_20ft = input.containers_20ft,
            containers_40ft = input.containers_40ft,
            ship_types = input.ships.len(),
            loading_time = value,
            "computed loading time"
        );
        value
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn mixed_fleet_example() {
        let records = [CraneRecord::new(3, 2), CraneRecord::new(2, 1)];
        assert_eq!(total_cranes(&records), 8.0);
        assert_eq!(compute(10, 5, &records), 4.375);
    }

    #[test]
    fn no_records_means_zero() {
        assert_eq!(compute(10, 5, &[]), 0.0);
    }

    #[test]
    fn zero_capacity_records_mean_zero() {
        let records = [CraneRecord::new(0, 4), CraneRecord::new(5, 0)];
        assert_eq!(compute(1_000, 1_000, &records), 0.0);
    }

    #[test]
    fn matches_formula_across_inputs() {
        for c20 in [0_u32, 1, 7, 250] {
            for c40 in [0_u32, 3, 90] {
                for (cranes, count) in [(1_u32, 1_u32), (2, 3), (7, 11)] {
                    let records = [CraneRecord::new(cranes, count)];
                    let expected = (f64::from(c20) * 2.0 + f64::from(c40) * 3.0)
                        / (f64::from(cranes) * f64::from(count));
                    assert_eq!(compute(c20, c40, &records), expected);
                }
            }
        }
    }

    #[test]
    fn estimator_uses_formula() {
        let records = [CraneRecord::new(4, 1)];
        let input = CalculationInput {
            containers_20ft: 2,
            containers_40ft: 0,
            ships: &records,
        };
        assert_eq!(CraneCapacityEstimator.estimate(&input), 1.0);
    }
}
