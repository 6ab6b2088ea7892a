use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a stress scenario.
///
/// # Examples
///
/// ```
/// use resilience_engine::core::scenario::ScenarioId;
///
/// let base = ScenarioId::new("base");
/// assert_eq!(base, ScenarioId::from(ScenarioId::BASE));
/// assert_eq!(base.as_str(), "base");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(String);

impl ScenarioId {
    pub const BASE: &'static str = "base";
    pub const INCOME_DROP_30: &'static str = "income-drop-30";
    pub const INCOME_DROP_50: &'static str = "income-drop-50";
    pub const COMBINED_SHOCK: &'static str = "combined-shock";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ScenarioId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A named stress hypothesis.
///
/// `income_factor` scales monthly income (1.0 = unchanged, 0.5 = half) and
/// `expense_factor` scales combined fixed and variable expenses (1.2 = +20%).
/// Both apply uniformly to every month of the horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: ScenarioId,
    pub name: String,
    pub description: String,
    pub income_factor: Decimal,
    pub expense_factor: Decimal,
    pub enabled: bool,
}

impl Scenario {
    /// Create an enabled scenario.
    pub fn new(
        id: impl Into<ScenarioId>,
        name: impl Into<String>,
        description: impl Into<String>,
        income_factor: Decimal,
        expense_factor: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            income_factor,
            expense_factor,
            enabled: true,
        }
    }

    /// Build a scenario from slider-style percentages: `income_drop_pct` off
    /// the income, `expense_rise_pct` on top of expenses.
    pub fn from_shock(
        id: impl Into<ScenarioId>,
        name: impl Into<String>,
        income_drop_pct: Decimal,
        expense_rise_pct: Decimal,
    ) -> Self {
        let (income_factor, expense_factor) = shock_factors(income_drop_pct, expense_rise_pct);
        Self::new(
            id,
            name,
            format!("Income -{income_drop_pct}%, expenses +{expense_rise_pct}%"),
            income_factor,
            expense_factor,
        )
    }

    /// Start the scenario in the given enabled state.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// The four scenarios every session starts with.
    pub fn canonical() -> Vec<Scenario> {
        vec![
            Scenario::new(
                ScenarioId::BASE,
                "Base",
                "Everything stays as it is now",
                dec!(1.0),
                dec!(1.0),
            ),
            Scenario::new(
                ScenarioId::INCOME_DROP_30,
                "Income drop (-30%)",
                "Losing part of the income",
                dec!(0.7),
                dec!(1.0),
            ),
            Scenario::new(
                ScenarioId::INCOME_DROP_50,
                "Income loss (-50%)",
                "A serious cut in income",
                dec!(0.5),
                dec!(1.0),
            ),
            Scenario::new(
                ScenarioId::COMBINED_SHOCK,
                "Combined shock",
                "Income falls while expenses rise",
                dec!(0.6),
                dec!(1.2),
            ),
        ]
    }
}

/// Convert percentage shocks into `(income_factor, expense_factor)`.
pub fn shock_factors(income_drop_pct: Decimal, expense_rise_pct: Decimal) -> (Decimal, Decimal) {
    let hundred = Decimal::ONE_HUNDRED;
    (
        Decimal::ONE - income_drop_pct / hundred,
        Decimal::ONE + expense_rise_pct / hundred,
    )
}

/// Insertion-ordered set of scenarios keyed by id.
///
/// Iteration order is the order scenarios were first inserted; re-inserting
/// an existing id replaces that scenario without moving it. The collection
/// holds a handful of entries, so lookups are linear.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioRegistry {
    scenarios: Vec<Scenario>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the four canonical scenarios, all enabled.
    pub fn canonical() -> Self {
        Scenario::canonical().into_iter().collect()
    }

    /// Insert or replace a scenario. Returns the previous definition if the id
    /// was already registered.
    pub fn insert(&mut self, scenario: Scenario) -> Option<Scenario> {
        match self.scenarios.iter().position(|s| s.id == scenario.id) {
            Some(idx) => Some(std::mem::replace(&mut self.scenarios[idx], scenario)),
            None => {
                self.scenarios.push(scenario);
                None
            }
        }
    }

    pub fn remove(&mut self, id: &ScenarioId) -> Option<Scenario> {
        let idx = self.scenarios.iter().position(|s| &s.id == id)?;
        Some(self.scenarios.remove(idx))
    }

    pub fn get(&self, id: &ScenarioId) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| &s.id == id)
    }

    pub fn get_mut(&mut self, id: &ScenarioId) -> Option<&mut Scenario> {
        self.scenarios.iter_mut().find(|s| &s.id == id)
    }

    pub fn contains(&self, id: &ScenarioId) -> bool {
        self.get(id).is_some()
    }

    pub fn clear(&mut self) {
        self.scenarios.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter()
    }

    /// Scenarios that take part in a run, in registry order.
    pub fn enabled(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter().filter(|s| s.enabled)
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

impl FromIterator<Scenario> for ScenarioRegistry {
    fn from_iter<I: IntoIterator<Item = Scenario>>(iter: I) -> Self {
        let mut registry = ScenarioRegistry::new();
        for scenario in iter {
            registry.insert(scenario);
        }
        registry
    }
}
