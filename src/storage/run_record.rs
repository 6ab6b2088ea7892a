use crate::core::financials::BaseFinancials;
use crate::core::result::ScenarioResult;
use crate::core::scenario::ScenarioId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A saved run: the inputs, a per-scenario summary and the index at save time.
///
/// Serializes to the persisted history shape:
///
/// ```text
/// { "id": 1760434200000, "date": "2025-10-14T09:30:00.000Z",
///   "baseData": { "income": ..., "fixedExpenses": ..., ... },
///   "results": [{ "id": "base", "scenarioName": ..., "survivalMonths": ...,
///                 "deathMonth": null, "survived": true }],
///   "stressIndex": 40 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    /// Milliseconds since the Unix epoch at save time.
    pub id: i64,
    #[serde(with = "iso_millis")]
    pub date: DateTime<Utc>,
    pub base_data: BaseFinancials,
    pub results: Vec<RunSummary>,
    pub stress_index: u8,
}

impl fmt::Display for RunRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{}  {}  income {}  savings {}  index {}",
            self.id,
            self.date.format("%Y-%m-%d %H:%M"),
            self.base_data.income,
            self.base_data.savings,
            self.stress_index
        )
    }
}

/// Scenario outcome kept in history. Monthly detail is not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub id: ScenarioId,
    pub scenario_name: String,
    pub survival_months: u32,
    pub death_month: Option<u32>,
    pub survived: bool,
}

impl From<&ScenarioResult> for RunSummary {
    fn from(result: &ScenarioResult) -> Self {
        Self {
            id: result.scenario_id.clone(),
            scenario_name: result.scenario_name.clone(),
            survival_months: result.survival_months,
            death_month: result.death_month,
            survived: result.survived,
        }
    }
}

/// ISO-8601 timestamps with millisecond precision and a `Z` suffix.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| de::Error::custom(format!("invalid date '{raw}': {e}")))
    }
}
