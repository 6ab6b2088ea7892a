use crate::core::result::ScenarioResult;
use crate::core::scenario::ScenarioId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk level of one scenario, from its survival months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Fewer than 3 solvent months.
    Critical,
    /// 3 to 5 solvent months.
    Warning,
    /// 6 or more solvent months.
    Stable,
}

impl RiskLevel {
    pub fn from_survival_months(months: u32) -> Self {
        if months >= 6 {
            RiskLevel::Stable
        } else if months >= 3 {
            RiskLevel::Warning
        } else {
            RiskLevel::Critical
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Critical => "CRITICAL",
            RiskLevel::Warning => "WARNING",
            RiskLevel::Stable => "STABLE",
        };
        write!(f, "{label}")
    }
}

/// Band of the composite stress index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResilienceBand {
    Low,
    Medium,
    High,
}

impl ResilienceBand {
    pub fn from_index(index: u8) -> Self {
        if index >= 70 {
            ResilienceBand::High
        } else if index >= 40 {
            ResilienceBand::Medium
        } else {
            ResilienceBand::Low
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            ResilienceBand::High => {
                "Strong stress resilience: temporary setbacks are well covered."
            }
            ResilienceBand::Medium => {
                "Moderate resilience: growing the financial cushion is recommended."
            }
            ResilienceBand::Low => "Low stress resilience: finances are exposed to shocks.",
        }
    }
}

impl fmt::Display for ResilienceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResilienceBand::Low => "LOW",
            ResilienceBand::Medium => "MEDIUM",
            ResilienceBand::High => "HIGH",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "month", rename_all = "kebab-case")]
pub enum Outcome {
    SurvivedHorizon,
    InsolventAt(u32),
}

/// Per-scenario verdict card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioVerdict {
    pub scenario_id: ScenarioId,
    pub scenario_name: String,
    pub survival_months: u32,
    pub risk: RiskLevel,
    pub outcome: Outcome,
}

impl From<&ScenarioResult> for ScenarioVerdict {
    fn from(result: &ScenarioResult) -> Self {
        let outcome = match result.death_month {
            Some(month) => Outcome::InsolventAt(month),
            None => Outcome::SurvivedHorizon,
        };
        Self {
            scenario_id: result.scenario_id.clone(),
            scenario_name: result.scenario_name.clone(),
            survival_months: result.survival_months,
            risk: RiskLevel::from_survival_months(result.survival_months),
            outcome,
        }
    }
}

impl fmt::Display for ScenarioVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} months, ",
            self.risk, self.scenario_name, self.survival_months
        )?;
        match self.outcome {
            Outcome::SurvivedHorizon => write!(f, "survives the whole horizon"),
            Outcome::InsolventAt(month) => write!(f, "insolvent in month {month}"),
        }
    }
}
