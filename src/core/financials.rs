use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The user's monthly financial picture, as entered on the input form.
///
/// All figures are monthly except `savings`, which is the starting reserve
/// the simulation draws down. `debt` is carried for display and history only;
/// it never enters the cash-flow math.
///
/// Values are accepted as given, negatives included. Sanitizing loose form
/// input is the job of [`FinancialInput`].
///
/// # Examples
///
/// ```
/// use resilience_engine::core::financials::BaseFinancials;
/// use rust_decimal_macros::dec;
///
/// let base = BaseFinancials {
///     income: dec!(100_000),
///     fixed_expenses: dec!(40_000),
///     variable_expenses: dec!(20_000),
///     savings: dec!(0),
///     debt: dec!(0),
/// };
///
/// assert_eq!(base.total_expenses(), dec!(60_000));
/// assert_eq!(base.monthly_net(), dec!(40_000));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseFinancials {
    #[serde(with = "rust_decimal::serde::float")]
    pub income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub fixed_expenses: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub variable_expenses: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub savings: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub debt: Decimal,
}

impl BaseFinancials {
    /// Coerce a loose form object into base financials.
    ///
    /// Never fails: anything that is not a finite number (or a string holding
    /// one) becomes zero.
    pub fn from_input(input: &FinancialInput) -> Self {
        Self {
            income: coerce_amount(&input.income),
            fixed_expenses: coerce_amount(&input.fixed_expenses),
            variable_expenses: coerce_amount(&input.variable_expenses),
            savings: coerce_amount(&input.savings),
            debt: coerce_amount(&input.debt),
        }
    }

    /// Fixed plus variable expenses, before any scenario multiplier.
    pub fn total_expenses(&self) -> Decimal {
        self.fixed_expenses.saturating_add(self.variable_expenses)
    }

    /// Unstressed monthly cash flow.
    pub fn monthly_net(&self) -> Decimal {
        self.income.saturating_sub(self.total_expenses())
    }

    /// Form-level warnings. These never block a simulation.
    pub fn warnings(&self) -> Vec<InputWarning> {
        let mut warnings = Vec::new();
        if self.income.is_zero() {
            warnings.push(InputWarning::MissingIncome);
        }
        if self.savings.is_zero() {
            warnings.push(InputWarning::NoReserve);
        }
        warnings
    }
}

impl fmt::Display for BaseFinancials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Income:            {}", self.income)?;
        writeln!(f, "Fixed Expenses:    {}", self.fixed_expenses)?;
        writeln!(f, "Variable Expenses: {}", self.variable_expenses)?;
        writeln!(f, "Savings:           {}", self.savings)?;
        write!(f, "Debt:              {}", self.debt)
    }
}

/// Raw financial input as it arrives from a form or a JSON file.
///
/// Each field may hold a number, a numeric string, a boolean, `null`, or be
/// missing altogether.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FinancialInput {
    pub income: Value,
    pub fixed_expenses: Value,
    pub variable_expenses: Value,
    pub savings: Value,
    pub debt: Value,
}

impl From<&BaseFinancials> for FinancialInput {
    fn from(base: &BaseFinancials) -> Self {
        let to_value = |amount: Decimal| Value::String(amount.to_string());
        Self {
            income: to_value(base.income),
            fixed_expenses: to_value(base.fixed_expenses),
            variable_expenses: to_value(base.variable_expenses),
            savings: to_value(base.savings),
            debt: to_value(base.debt),
        }
    }
}

/// Non-blocking validation findings on base data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputWarning {
    /// Income is zero; every stressed scenario collapses onto the reserve.
    MissingIncome,
    /// There is no starting reserve to absorb a deficit.
    NoReserve,
}

impl fmt::Display for InputWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputWarning::MissingIncome => write!(f, "monthly income is missing or zero"),
            InputWarning::NoReserve => write!(f, "there is no financial cushion (savings = 0)"),
        }
    }
}

/// Convert a loose JSON value to an amount, defaulting to zero.
///
/// Numeric strings may be decimal, exponent or `0x` / `0o` / `0b` integer
/// literals. Finite values beyond the `Decimal` range clamp to its bounds.
pub fn coerce_amount(value: &Value) -> Decimal {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else if let Some(amount) = parse_radix_literal(trimmed) {
                return amount;
            } else {
                let parsed = trimmed.parse::<f64>().ok().filter(|n| n.is_finite());
                // Plain decimal strings keep their precision.
                if let (Some(_), Ok(exact)) = (parsed, trimmed.parse::<Decimal>()) {
                    return exact;
                }
                parsed
            }
        }
        Value::Bool(true) => Some(1.0),
        Value::Bool(false) | Value::Null | Value::Array(_) | Value::Object(_) => None,
    };

    number
        .filter(|n| n.is_finite())
        .map(clamp_f64)
        .unwrap_or(Decimal::ZERO)
}

/// Finite `f64` to `Decimal`, saturating at the bounds.
fn clamp_f64(n: f64) -> Decimal {
    match Decimal::from_f64(n) {
        Some(amount) => amount,
        None if n.abs() < 1.0 => Decimal::ZERO,
        None if n.is_sign_negative() => Decimal::MIN,
        None => Decimal::MAX,
    }
}

/// Unsigned `0x` / `0o` / `0b` literal. `None` when `raw` has no such prefix
/// or holds digits outside the radix.
fn parse_radix_literal(raw: &str) -> Option<Decimal> {
    let prefix = raw.get(..2)?.to_ascii_lowercase();
    let radix = match prefix.as_str() {
        "0x" => 16,
        "0o" => 8,
        "0b" => 2,
        _ => return None,
    };
    let digits = &raw[2..];
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    Some(
        u128::from_str_radix(digits, radix)
            .ok()
            .and_then(Decimal::from_u128)
            .unwrap_or(Decimal::MAX),
    )
}
