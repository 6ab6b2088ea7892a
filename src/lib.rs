//! # resilience-engine
//!
//! Deterministic financial stress testing and resilience scoring.
//!
//! Given a household's monthly income, expenses and starting reserve, the
//! engine projects the balance month by month under a set of shock
//! scenarios, finds the first insolvent month of each, and folds the
//! outcomes into a 0–100 stress index.
//!
//! ## Architecture
//!
//! - **core**: base financials, scenarios, monthly records, results
//! - **simulation**: Cash-flow projection, stress index, the session engine
//! - **analysis**: Risk verdicts, runway and recovery levers
//! - **storage**: Run history records and the key-value persistence boundary

pub mod analysis;
pub mod core;
pub mod simulation;
pub mod storage;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::analysis::diagnosis::{Breakdown, Diagnosis, Lever};
    pub use crate::analysis::verdict::{ResilienceBand, RiskLevel, ScenarioVerdict};
    pub use crate::core::financials::{BaseFinancials, FinancialInput};
    pub use crate::core::result::{MonthRecord, ScenarioResult, SimulationResults};
    pub use crate::core::scenario::{Scenario, ScenarioId, ScenarioRegistry};
    pub use crate::simulation::engine::{EngineConfig, SavedRun, ScenarioEngine};
    pub use crate::simulation::stress_index::WeightTable;
    pub use crate::storage::history::{HistoryStore, KvHistoryStore};
    pub use crate::storage::kv::{FileStore, KeyValueStore, MemoryStore};
    pub use crate::storage::run_record::{RunRecord, RunSummary};
}
