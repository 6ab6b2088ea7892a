//! Composite stress (resilience) index.
//!
//! Each scenario earns a score from its survival months, then scores are
//! averaged with per-scenario severity weights and rounded to an integer in
//! `0..=100`.
//!
//! | survival months | score              |
//! |-----------------|--------------------|
//! | `>= 12`         | 100                |
//! | `6..12`         | 60 + (m - 6) * 20/3 |
//! | `3..6`          | 30 + (m - 3) * 10  |
//! | `< 3`           | m * 10             |

use crate::core::result::{ScenarioResult, SimulationResults};
use crate::core::scenario::ScenarioId;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Score for a single scenario, `0..=100`.
pub fn scenario_score(survival_months: u32) -> Decimal {
    let months = Decimal::from(survival_months);
    if survival_months >= 12 {
        dec!(100)
    } else if survival_months >= 6 {
        dec!(60) + (months - dec!(6)) * dec!(20) / dec!(3)
    } else if survival_months >= 3 {
        dec!(30) + (months - dec!(3)) * dec!(10)
    } else {
        months * dec!(10)
    }
}

/// Severity weights by scenario id.
///
/// Unknown ids fall back to `default_weight`, so custom scenarios count as
/// much as the base case unless configured otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    weights: HashMap<ScenarioId, Decimal>,
    default_weight: Decimal,
}

impl WeightTable {
    /// A table with no explicit entries.
    pub fn uniform(default_weight: Decimal) -> Self {
        Self {
            weights: HashMap::new(),
            default_weight,
        }
    }

    pub fn with_weight(mut self, id: impl Into<ScenarioId>, weight: Decimal) -> Self {
        self.set(id, weight);
        self
    }

    pub fn set(&mut self, id: impl Into<ScenarioId>, weight: Decimal) {
        self.weights.insert(id.into(), weight);
    }

    pub fn weight(&self, id: &ScenarioId) -> Decimal {
        self.weights.get(id).copied().unwrap_or(self.default_weight)
    }

    pub fn default_weight(&self) -> Decimal {
        self.default_weight
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        WeightTable::uniform(Decimal::ONE)
            .with_weight(ScenarioId::BASE, dec!(1.0))
            .with_weight(ScenarioId::INCOME_DROP_30, dec!(1.2))
            .with_weight(ScenarioId::INCOME_DROP_50, dec!(1.5))
            .with_weight(ScenarioId::COMBINED_SHOCK, dec!(1.5))
    }
}

/// Weighted mean of scenario scores, rounded half away from zero.
///
/// Returns 0 for an empty result set (or when every weight is zero).
pub fn stress_index<'a, I>(results: I, weights: &WeightTable) -> u8
where
    I: IntoIterator<Item = &'a ScenarioResult>,
{
    let mut total_score = Decimal::ZERO;
    let mut total_weight = Decimal::ZERO;

    for result in results {
        let weight = weights.weight(&result.scenario_id);
        total_score += scenario_score(result.survival_months) * weight;
        total_weight += weight;
    }

    if total_weight <= Decimal::ZERO {
        return 0;
    }

    (total_score / total_weight)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
        .to_u8()
        .unwrap_or(0)
}

impl SimulationResults {
    /// Composite index over this result set with the given weights.
    pub fn stress_index(&self, weights: &WeightTable) -> u8 {
        stress_index(self, weights)
    }
}
