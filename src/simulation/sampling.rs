//! Random base-data generation for benchmarks and smoke tests.

use crate::core::financials::BaseFinancials;
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Ranges for generating random household finances.
#[derive(Debug, Clone)]
pub struct FinancialsConfig {
    /// Number of samples to generate.
    pub count: usize,
    /// Minimum monthly income.
    pub min_income: f64,
    /// Maximum monthly income.
    pub max_income: f64,
    /// Total expenses as a share of income, `(min, max)`.
    pub expense_ratio: (f64, f64),
    /// Share of expenses that is fixed, `(min, max)`.
    pub fixed_share: (f64, f64),
    /// Starting reserve in months of expenses, `(min, max)`.
    pub reserve_months: (f64, f64),
    /// Debt in months of income, `(min, max)`.
    pub debt_months: (f64, f64),
}

impl Default for FinancialsConfig {
    fn default() -> Self {
        Self {
            count: 10,
            min_income: 20_000.0,
            max_income: 300_000.0,
            expense_ratio: (0.4, 1.3),
            fixed_share: (0.3, 0.8),
            reserve_months: (0.0, 12.0),
            debt_months: (0.0, 6.0),
        }
    }
}

fn sample(rng: &mut impl Rng, (low, high): (f64, f64)) -> f64 {
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}

fn amount(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .unwrap_or(Decimal::ZERO)
        .round_dp(2)
}

/// Generate `config.count` random base-data samples.
pub fn generate_random_financials(config: &FinancialsConfig) -> Vec<BaseFinancials> {
    let mut rng = rand::thread_rng();

    (0..config.count)
        .map(|_| {
            let income = sample(&mut rng, (config.min_income, config.max_income));
            let expenses = income * sample(&mut rng, config.expense_ratio);
            let fixed = expenses * sample(&mut rng, config.fixed_share);
            let savings = expenses * sample(&mut rng, config.reserve_months);
            let debt = income * sample(&mut rng, config.debt_months);

            BaseFinancials {
                income: amount(income),
                fixed_expenses: amount(fixed),
                variable_expenses: amount(expenses - fixed),
                savings: amount(savings),
                debt: amount(debt),
            }
        })
        .collect()
}
