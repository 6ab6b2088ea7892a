//! Month-by-month cash-flow projection.
//!
//! The model is flat: no interest on debt or savings, no
//! inflation, no income volatility, no behavioural response to a shock.
//! Each month applies the same scenario-adjusted income and expenses:
//!
//! ```text
//! balance(m) = balance(m - 1) + income * income_factor
//!              - (fixed + variable) * expense_factor
//! balance(0) = savings
//! ```
//!
//! The walk stops at the first month whose balance is `<= 0`, or after the
//! horizon.

use crate::core::financials::BaseFinancials;
use crate::core::result::{MonthRecord, ScenarioResult};
use crate::core::scenario::Scenario;
use log::debug;
use rust_decimal::Decimal;

/// Default projection horizon: ten years.
pub const HORIZON_MONTHS: u32 = 120;

/// Compute the balance and income/expense figures for one month.
pub fn project_month(
    base: &BaseFinancials,
    scenario: &Scenario,
    month: u32,
    previous_balance: Decimal,
) -> MonthRecord {
    let income = base.income.saturating_mul(scenario.income_factor);
    let expenses = base.total_expenses().saturating_mul(scenario.expense_factor);
    // Saturates at the Decimal bounds instead of overflowing.
    let balance = previous_balance.saturating_add(income).saturating_sub(expenses);

    MonthRecord {
        month,
        income,
        expenses,
        balance,
        is_negative: balance <= Decimal::ZERO,
    }
}

/// Walk a scenario forward until insolvency or the end of the horizon.
///
/// # Examples
///
/// ```
/// use resilience_engine::core::financials::BaseFinancials;
/// use resilience_engine::core::scenario::Scenario;
/// use resilience_engine::simulation::cashflow::{simulate, HORIZON_MONTHS};
/// use rust_decimal_macros::dec;
///
/// let base = BaseFinancials {
///     income: dec!(100_000),
///     fixed_expenses: dec!(40_000),
///     variable_expenses: dec!(20_000),
///     savings: dec!(0),
///     debt: dec!(0),
/// };
/// let half_income = Scenario::new("income-drop-50", "Income loss", "", dec!(0.5), dec!(1.0));
///
/// let result = simulate(&base, &half_income, HORIZON_MONTHS);
/// assert_eq!(result.death_month, Some(1));
/// assert_eq!(result.survival_months, 0);
/// assert!(!result.survived);
/// ```
pub fn simulate(base: &BaseFinancials, scenario: &Scenario, horizon_months: u32) -> ScenarioResult {
    let mut monthly_data = Vec::with_capacity(horizon_months as usize);
    let mut balance = base.savings;
    let mut death_month = None;

    for month in 1..=horizon_months {
        let record = project_month(base, scenario, month, balance);
        monthly_data.push(record);
        balance = record.balance;

        if record.is_negative {
            death_month = Some(month);
            break;
        }
    }

    let survived = death_month.is_none();
    let survival_months = match death_month {
        Some(month) => month - 1,
        None => horizon_months,
    };

    debug!(
        "scenario {}: {} solvent months, final balance {}",
        scenario.id, survival_months, balance
    );

    ScenarioResult {
        scenario_id: scenario.id.clone(),
        scenario_name: scenario.name.clone(),
        monthly_data,
        death_month,
        survived,
        survival_months,
    }
}
