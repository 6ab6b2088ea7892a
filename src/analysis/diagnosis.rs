//! "What broke" analysis of a scenario: runway, breakdown and levers.
//!
//! Runway is measured against a static reserve (`savings / expenses`), so it
//! answers how long the cushion lasts with no income at all, independent of
//! the month-by-month walk.

use crate::core::financials::BaseFinancials;
use crate::core::scenario::{Scenario, ScenarioId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_LEVERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Breakdown {
    /// Income is gone; the reserve is spent with nothing coming in.
    IncomeGone,
    /// Expenses exceed income; the reserve melts every month.
    Deficit,
    /// The reserve covers less than three months of expenses.
    ThinReserve,
    /// Nothing critical: the reserve covers expenses.
    Holding,
}

impl fmt::Display for Breakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Breakdown::IncomeGone => "Income drops to zero; the reserve is drained with no inflow.",
            Breakdown::Deficit => "Expenses exceed income; the reserve shrinks every month.",
            Breakdown::ThinReserve => "The reserve runs out in less than 3 months.",
            Breakdown::Holding => "No critical break: the reserve covers expenses.",
        };
        write!(f, "{text}")
    }
}

/// A suggested corrective action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "kebab-case")]
pub enum Lever {
    RestoreIncome,
    FreezeDiscretionary,
    /// Cut monthly expenses by at least this amount.
    CutExpenses(Decimal),
    FindQuickIncome,
    BuildReserve,
    CapSpending,
    DiversifyIncome,
    PrepareCutList,
    TopUpReserve,
}

impl fmt::Display for Lever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lever::RestoreIncome => {
                write!(f, "Restore at least one stable income stream for the next 1-2 months.")
            }
            Lever::FreezeDiscretionary => {
                write!(f, "Freeze optional spending and keep only critical payments.")
            }
            Lever::CutExpenses(gap) => {
                write!(f, "Cut mandatory expenses by at least {} per month.", gap.round_dp(0))
            }
            Lever::FindQuickIncome => write!(f, "Find a quick source of income for 2-4 weeks."),
            Lever::BuildReserve => write!(f, "Grow the reserve to 3-6 months of expenses."),
            Lever::CapSpending => {
                write!(f, "Set a spending ceiling: postpone large purchases and services.")
            }
            Lever::DiversifyIncome => {
                write!(f, "Diversify income: a second source or temporary side work.")
            }
            Lever::PrepareCutList => {
                write!(f, "List the expenses that can be cut quickly at the first warning sign.")
            }
            Lever::TopUpReserve => {
                write!(f, "Top up the reserve to at least one month of expenses.")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub scenario_id: ScenarioId,
    /// Scenario-adjusted monthly income.
    pub income: Decimal,
    /// Scenario-adjusted monthly expenses.
    pub expenses: Decimal,
    pub reserve: Decimal,
    /// Months the reserve covers expenses; `None` when expenses are not
    /// positive (unbounded runway).
    pub runway_months: Option<Decimal>,
    pub breakdown: Breakdown,
    pub levers: Vec<Lever>,
}

/// Diagnose a scenario against the given base data.
pub fn diagnose(base: &BaseFinancials, scenario: &Scenario) -> Diagnosis {
    let income = base.income.saturating_mul(scenario.income_factor);
    let expenses = base.total_expenses().saturating_mul(scenario.expense_factor);
    let reserve = base.savings;
    let runway_months = runway(reserve, expenses);

    Diagnosis {
        scenario_id: scenario.id.clone(),
        income,
        expenses,
        reserve,
        runway_months,
        breakdown: classify(income, expenses, runway_months),
        levers: levers(income, expenses, reserve, scenario),
    }
}

/// `reserve / expenses`, or `None` when expenses are zero or negative.
pub fn runway(reserve: Decimal, expenses: Decimal) -> Option<Decimal> {
    if expenses <= Decimal::ZERO {
        return None;
    }
    reserve.checked_div(expenses)
}

fn classify(income: Decimal, expenses: Decimal, runway_months: Option<Decimal>) -> Breakdown {
    if income <= Decimal::ZERO {
        Breakdown::IncomeGone
    } else if income < expenses {
        Breakdown::Deficit
    } else if runway_months.is_some_and(|r| r < dec!(3)) {
        Breakdown::ThinReserve
    } else {
        Breakdown::Holding
    }
}

fn levers(income: Decimal, expenses: Decimal, reserve: Decimal, scenario: &Scenario) -> Vec<Lever> {
    let mut levers = Vec::new();
    let gap = expenses.saturating_sub(income);

    if income <= Decimal::ZERO {
        levers.push(Lever::RestoreIncome);
        levers.push(Lever::FreezeDiscretionary);
    } else if gap > Decimal::ZERO {
        levers.push(Lever::CutExpenses(gap));
        levers.push(Lever::FindQuickIncome);
    } else {
        levers.push(Lever::BuildReserve);
    }

    if scenario.expense_factor > Decimal::ONE {
        levers.push(Lever::CapSpending);
    }

    if scenario.income_factor < Decimal::ONE {
        levers.push(Lever::DiversifyIncome);
    } else {
        levers.push(Lever::PrepareCutList);
    }

    if reserve < expenses {
        levers.push(Lever::TopUpReserve);
    }

    levers.truncate(MAX_LEVERS);
    levers
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.runway_months {
            Some(months) => writeln!(f, "  Runway:   {:.1} months", months)?,
            None => writeln!(f, "  Runway:   unlimited")?,
        }
        writeln!(f, "  Breakdown: {}", self.breakdown)?;
        for lever in &self.levers {
            writeln!(f, "  - {}", lever)?;
        }
        Ok(())
    }
}
