use crate::core::scenario::ScenarioId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One simulated month of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthRecord {
    /// 1-indexed month number.
    pub month: u32,
    /// Scenario-adjusted income for the month.
    pub income: Decimal,
    /// Scenario-adjusted expenses for the month.
    pub expenses: Decimal,
    /// Running reserve after this month's cash flow.
    pub balance: Decimal,
    /// `balance <= 0`. A month ending exactly at zero counts as insolvent.
    pub is_negative: bool,
}

impl MonthRecord {
    pub fn net(&self) -> Decimal {
        self.income.saturating_sub(self.expenses)
    }
}

/// Outcome of walking one scenario through the horizon.
///
/// `monthly_data` is chronological from month 1 and stops at the first
/// insolvent month, which is included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub scenario_id: ScenarioId,
    pub scenario_name: String,
    pub monthly_data: Vec<MonthRecord>,
    /// First month whose balance is `<= 0`, if any within the horizon.
    pub death_month: Option<u32>,
    pub survived: bool,
    /// Fully solvent months: the horizon length if survived, otherwise
    /// `death_month - 1`.
    pub survival_months: u32,
}

impl ScenarioResult {
    /// The first `n` months, e.g. for a compact table.
    pub fn first_months(&self, n: usize) -> &[MonthRecord] {
        &self.monthly_data[..n.min(self.monthly_data.len())]
    }

    /// Balance at the last simulated month, if any month was simulated.
    pub fn final_balance(&self) -> Option<Decimal> {
        self.monthly_data.last().map(|m| m.balance)
    }
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- {} ({}) ---", self.scenario_name, self.scenario_id)?;
        writeln!(f, "  Survival months: {}", self.survival_months)?;
        match self.death_month {
            Some(month) => writeln!(f, "  Insolvent in month {}", month)?,
            None => writeln!(f, "  Survives the whole horizon")?,
        }
        if let Some(balance) = self.final_balance() {
            writeln!(f, "  Final balance:   {}", balance.round_dp(2))?;
        }
        Ok(())
    }
}

/// Results of one run, in scenario registry order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimulationResults {
    results: Vec<ScenarioResult>,
}

impl SimulationResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a result, replacing any earlier result for the same scenario.
    pub fn insert(&mut self, result: ScenarioResult) {
        match self
            .results
            .iter()
            .position(|r| r.scenario_id == result.scenario_id)
        {
            Some(idx) => self.results[idx] = result,
            None => self.results.push(result),
        }
    }

    pub fn get(&self, id: &ScenarioId) -> Option<&ScenarioResult> {
        self.results.iter().find(|r| &r.scenario_id == id)
    }

    pub fn contains(&self, id: &ScenarioId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScenarioResult> {
        self.results.iter()
    }

    pub fn as_slice(&self) -> &[ScenarioResult] {
        &self.results
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl<'a> IntoIterator for &'a SimulationResults {
    type Item = &'a ScenarioResult;
    type IntoIter = std::slice::Iter<'a, ScenarioResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

impl FromIterator<ScenarioResult> for SimulationResults {
    fn from_iter<I: IntoIterator<Item = ScenarioResult>>(iter: I) -> Self {
        let mut results = SimulationResults::new();
        for result in iter {
            results.insert(result);
        }
        results
    }
}

impl fmt::Display for SimulationResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Simulation Results ===")?;
        if self.results.is_empty() {
            return writeln!(f, "No scenarios were run.");
        }
        for result in &self.results {
            write!(f, "{}", result)?;
        }
        Ok(())
    }
}
