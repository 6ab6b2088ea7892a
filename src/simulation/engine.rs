use crate::analysis::diagnosis::{diagnose, Diagnosis};
use crate::analysis::verdict::{ResilienceBand, ScenarioVerdict};
use crate::core::financials::{BaseFinancials, FinancialInput};
use crate::core::result::{ScenarioResult, SimulationResults};
use crate::core::scenario::{shock_factors, Scenario, ScenarioId, ScenarioRegistry};
use crate::simulation::cashflow::{simulate, HORIZON_MONTHS};
use crate::simulation::stress_index::WeightTable;
use crate::storage::history::{HistoryStore, KvHistoryStore};
use crate::storage::kv::MemoryStore;
use crate::storage::run_record::{RunRecord, RunSummary};
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info, warn};
use rust_decimal::Decimal;

/// Default number of runs kept in history.
pub const HISTORY_LIMIT: usize = 20;

/// Tunables of a [`ScenarioEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Months each scenario is projected for.
    pub horizon_months: u32,
    /// Maximum number of saved runs; older runs are evicted.
    pub history_limit: usize,
    /// Severity weights for the stress index.
    pub weights: WeightTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            horizon_months: HORIZON_MONTHS,
            history_limit: HISTORY_LIMIT,
            weights: WeightTable::default(),
        }
    }
}

/// Outcome of [`ScenarioEngine::save_run`].
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRun {
    pub record: RunRecord,
    /// Whether the updated history reached the store. The run is kept in
    /// memory either way.
    pub persisted: bool,
}

/// A stress-test session: base data, scenarios, the latest results and the
/// run history.
///
/// History persistence goes through the injected [`HistoryStore`]. Storage
/// failures are logged and degrade to an empty or unsaved history; none of
/// the engine's operations fail.
///
/// # Examples
///
/// ```
/// use resilience_engine::core::financials::FinancialInput;
/// use resilience_engine::simulation::engine::ScenarioEngine;
/// use serde_json::json;
///
/// let mut engine = ScenarioEngine::in_memory();
/// let input: FinancialInput = serde_json::from_value(json!({
///     "income": 100000,
///     "fixedExpenses": 40000,
///     "variableExpenses": 20000,
///     "savings": 0,
/// }))
/// .unwrap();
/// engine.set_base_data(&input);
///
/// let results = engine.run_simulation();
/// assert_eq!(results.len(), 4);
/// assert!(engine.calculate_stress_index() <= 100);
/// ```
#[derive(Debug)]
pub struct ScenarioEngine<H: HistoryStore> {
    config: EngineConfig,
    base: BaseFinancials,
    scenarios: ScenarioRegistry,
    results: SimulationResults,
    history: Vec<RunRecord>,
    store: H,
}

impl ScenarioEngine<KvHistoryStore<MemoryStore>> {
    /// Engine backed by a throwaway in-memory history.
    pub fn in_memory() -> Self {
        Self::new(KvHistoryStore::in_memory())
    }
}

impl<H: HistoryStore> ScenarioEngine<H> {
    pub fn new(store: H) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    /// Build an engine, loading any saved history from `store`. The four
    /// canonical scenarios are registered and enabled.
    pub fn with_config(store: H, config: EngineConfig) -> Self {
        let history = load_or_empty(&store);
        Self {
            config,
            base: BaseFinancials::default(),
            scenarios: ScenarioRegistry::canonical(),
            results: SimulationResults::new(),
            history,
            store,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Base data ---

    /// Replace the base data, coercing every field to a number.
    pub fn set_base_data(&mut self, input: &FinancialInput) {
        self.set_base_financials(BaseFinancials::from_input(input));
    }

    pub fn set_base_financials(&mut self, base: BaseFinancials) {
        self.base = base;
    }

    pub fn base_data(&self) -> &BaseFinancials {
        &self.base
    }

    // --- Scenario registry ---

    /// Reset the registry to the four canonical scenarios, all enabled.
    /// Custom scenarios are dropped.
    pub fn initialize_scenarios(&mut self) {
        self.scenarios = ScenarioRegistry::canonical();
    }

    /// Overwrite a scenario's factors. Unknown ids are ignored.
    pub fn update_scenario(&mut self, id: &ScenarioId, income_factor: Decimal, expense_factor: Decimal) {
        if let Some(scenario) = self.scenarios.get_mut(id) {
            scenario.income_factor = income_factor;
            scenario.expense_factor = expense_factor;
        }
    }

    /// Set factors from percentages (income drop, expense rise). Unknown ids
    /// are ignored.
    pub fn apply_shock(&mut self, id: &ScenarioId, income_drop_pct: Decimal, expense_rise_pct: Decimal) {
        let (income_factor, expense_factor) = shock_factors(income_drop_pct, expense_rise_pct);
        self.update_scenario(id, income_factor, expense_factor);
    }

    /// Enable or disable a scenario. Unknown ids are ignored.
    pub fn toggle_scenario(&mut self, id: &ScenarioId, enabled: bool) {
        if let Some(scenario) = self.scenarios.get_mut(id) {
            scenario.enabled = enabled;
        }
    }

    /// Register a scenario. An existing id is replaced in place.
    pub fn add_scenario(&mut self, scenario: Scenario) {
        self.scenarios.insert(scenario);
    }

    pub fn scenario(&self, id: &ScenarioId) -> Option<&Scenario> {
        self.scenarios.get(id)
    }

    pub fn scenarios(&self) -> &ScenarioRegistry {
        &self.scenarios
    }

    // --- Simulation ---

    /// Project one scenario against the current base data.
    pub fn simulate_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        simulate(&self.base, scenario, self.config.horizon_months)
    }

    /// Discard previous results and simulate every enabled scenario.
    pub fn run_simulation(&mut self) -> &SimulationResults {
        let results: SimulationResults = self
            .scenarios
            .enabled()
            .map(|scenario| simulate(&self.base, scenario, self.config.horizon_months))
            .collect();

        debug!(
            "ran {} of {} scenarios",
            results.len(),
            self.scenarios.len()
        );
        self.results = results;
        &self.results
    }

    pub fn results(&self) -> &SimulationResults {
        &self.results
    }

    /// Composite index over the current results; 0 when there are none.
    pub fn calculate_stress_index(&self) -> u8 {
        self.results.stress_index(&self.config.weights)
    }

    pub fn resilience_band(&self) -> ResilienceBand {
        ResilienceBand::from_index(self.calculate_stress_index())
    }

    pub fn verdicts(&self) -> Vec<ScenarioVerdict> {
        self.results.iter().map(ScenarioVerdict::from).collect()
    }

    /// Runway / breakdown / levers for a registered scenario.
    pub fn diagnose(&self, id: &ScenarioId) -> Option<Diagnosis> {
        self.scenarios.get(id).map(|s| diagnose(&self.base, s))
    }

    // --- History ---

    /// Saved runs, newest first.
    pub fn history(&self) -> &[RunRecord] {
        &self.history
    }

    /// Save the current run, stamped with the current time.
    pub fn save_run(&mut self) -> SavedRun {
        self.save_run_at(Utc::now())
    }

    /// Save the current run with an explicit timestamp.
    ///
    /// The timestamp is truncated to milliseconds, the precision history is
    /// stored with. Run ids are that timestamp, bumped past the newest saved
    /// id when needed so they stay unique and decreasing down the list.
    pub fn save_run_at(&mut self, now: DateTime<Utc>) -> SavedRun {
        let millis = now.timestamp_millis();
        let date = Utc.timestamp_millis_opt(millis).single().unwrap_or(now);
        let id = match self.history.first() {
            Some(newest) => millis.max(newest.id.saturating_add(1)),
            None => millis,
        };

        let record = RunRecord {
            id,
            date,
            base_data: self.base,
            results: self.results.iter().map(RunSummary::from).collect(),
            stress_index: self.calculate_stress_index(),
        };

        self.history.insert(0, record.clone());
        self.history.truncate(self.config.history_limit);

        let persisted = match self.store.save_history(&self.history) {
            Ok(()) => {
                info!(
                    "saved run {} (index {}), {} runs in history",
                    record.id,
                    record.stress_index,
                    self.history.len()
                );
                true
            }
            Err(e) => {
                warn!("could not save run history: {e}");
                false
            }
        };

        SavedRun { record, persisted }
    }

    /// Restore the base data of a saved run and return the run.
    ///
    /// Scenarios, results and the index are left alone; run the simulation
    /// again to refresh them.
    pub fn load_run(&mut self, id: i64) -> Option<RunRecord> {
        let record = self.history.iter().find(|r| r.id == id)?.clone();
        self.set_base_financials(record.base_data);
        Some(record)
    }

    /// Forget every saved run, in memory and in the store.
    pub fn clear_history(&mut self) {
        self.history.clear();
        match self.store.clear_history() {
            Ok(()) => info!("run history cleared"),
            Err(e) => warn!("could not clear stored run history: {e}"),
        }
    }

    /// Re-read history from the store, replacing the in-memory list.
    pub fn reload_history(&mut self) {
        self.history = load_or_empty(&self.store);
    }

    pub fn history_store(&self) -> &H {
        &self.store
    }

    pub fn history_store_mut(&mut self) -> &mut H {
        &mut self.store
    }
}

fn load_or_empty<H: HistoryStore>(store: &H) -> Vec<RunRecord> {
    match store.load_history() {
        Ok(history) => history,
        Err(e) => {
            warn!("could not load run history, starting empty: {e}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::kv::KeyValueStore;
    use crate::storage::StorageError;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn engine_with(
        income: Decimal,
        fixed: Decimal,
        variable: Decimal,
        savings: Decimal,
    ) -> ScenarioEngine<KvHistoryStore<MemoryStore>> {
        let mut engine = ScenarioEngine::in_memory();
        engine.set_base_financials(BaseFinancials {
            income,
            fixed_expenses: fixed,
            variable_expenses: variable,
            savings,
            debt: Decimal::ZERO,
        });
        engine
    }

    fn id(s: &str) -> ScenarioId {
        ScenarioId::new(s)
    }

    /// Store whose every operation fails.
    struct BrokenStore;

    impl HistoryStore for BrokenStore {
        fn load_history(&self) -> Result<Vec<RunRecord>, StorageError> {
            Err(StorageError::Unavailable("disk gone".into()))
        }
        fn save_history(&mut self, _: &[RunRecord]) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disk gone".into()))
        }
        fn clear_history(&mut self) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disk gone".into()))
        }
    }

    #[test]
    fn test_set_base_data_coerces() {
        let mut engine = ScenarioEngine::in_memory();
        let input: FinancialInput = serde_json::from_value(json!({
            "income": "5000",
            "fixedExpenses": null,
            "variableExpenses": "lots",
            "savings": -100,
        }))
        .unwrap();
        engine.set_base_data(&input);

        let base = engine.base_data();
        assert_eq!(base.income, dec!(5000));
        assert_eq!(base.fixed_expenses, Decimal::ZERO);
        assert_eq!(base.variable_expenses, Decimal::ZERO);
        assert_eq!(base.savings, dec!(-100));
        assert_eq!(base.debt, Decimal::ZERO);
    }

    #[test]
    fn test_base_data_does_not_touch_results() {
        let mut engine = engine_with(dec!(100), dec!(10), dec!(0), dec!(0));
        engine.run_simulation();
        engine.set_base_data(&FinancialInput::default());
        assert_eq!(engine.results().len(), 4);
    }

    #[test]
    fn test_update_and_toggle_unknown_ids_are_noops() {
        let mut engine = ScenarioEngine::in_memory();
        let before: Vec<Scenario> = engine.scenarios().iter().cloned().collect();
        engine.update_scenario(&id("nope"), dec!(0.1), dec!(9));
        engine.toggle_scenario(&id("nope"), false);
        engine.apply_shock(&id("nope"), dec!(50), dec!(50));

        let after: Vec<Scenario> = engine.scenarios().iter().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_update_scenario_in_place() {
        let mut engine = ScenarioEngine::in_memory();
        engine.update_scenario(&id("combined-shock"), dec!(0.5), dec!(1.5));
        let s = engine.scenario(&id("combined-shock")).unwrap();
        assert_eq!((s.income_factor, s.expense_factor), (dec!(0.5), dec!(1.5)));

        engine.apply_shock(&id("income-drop-30"), dec!(20), dec!(0));
        let s = engine.scenario(&id("income-drop-30")).unwrap();
        assert_eq!((s.income_factor, s.expense_factor), (dec!(0.8), dec!(1)));
    }

    #[test]
    fn test_initialize_scenarios_replaces_custom() {
        let mut engine = ScenarioEngine::in_memory();
        engine.add_scenario(Scenario::new("job-loss", "Job loss", "", dec!(0), dec!(1)));
        engine.toggle_scenario(&id("base"), false);
        assert_eq!(engine.scenarios().len(), 5);

        engine.initialize_scenarios();
        assert_eq!(engine.scenarios().len(), 4);
        assert!(engine.scenario(&id("job-loss")).is_none());
        assert!(engine.scenarios().iter().all(|s| s.enabled));
    }

    #[test]
    fn test_disabled_scenarios_absent_from_results() {
        let mut engine = engine_with(dec!(100000), dec!(40000), dec!(20000), dec!(0));
        engine.toggle_scenario(&id("income-drop-30"), false);
        engine.toggle_scenario(&id("combined-shock"), false);

        let results = engine.run_simulation();
        let ids: Vec<&str> = results.iter().map(|r| r.scenario_id.as_str()).collect();
        assert_eq!(ids, vec!["base", "income-drop-50"]);
        assert!(!results.contains(&id("combined-shock")));
    }

    #[test]
    fn test_run_simulation_clears_previous_results() {
        let mut engine = engine_with(dec!(100000), dec!(40000), dec!(20000), dec!(0));
        engine.run_simulation();
        assert_eq!(engine.results().len(), 4);

        for s in ["base", "income-drop-30", "income-drop-50"] {
            engine.toggle_scenario(&id(s), false);
        }
        engine.run_simulation();
        assert_eq!(engine.results().len(), 1);
    }

    #[test]
    fn test_index_example_base_and_half_income() {
        let mut engine = engine_with(dec!(100000), dec!(40000), dec!(20000), dec!(0));
        engine.toggle_scenario(&id("income-drop-30"), false);
        engine.toggle_scenario(&id("combined-shock"), false);
        engine.run_simulation();

        assert_eq!(engine.calculate_stress_index(), 40);
        assert_eq!(engine.resilience_band(), ResilienceBand::Medium);
    }

    #[test]
    fn test_index_without_results_is_zero() {
        let engine = ScenarioEngine::in_memory();
        assert_eq!(engine.calculate_stress_index(), 0);
    }

    #[test]
    fn test_index_recomputed_after_rerun() {
        let mut engine = engine_with(dec!(100000), dec!(40000), dec!(20000), dec!(0));
        engine.run_simulation();
        let first = engine.calculate_stress_index();

        engine.set_base_financials(BaseFinancials {
            income: dec!(100000),
            fixed_expenses: dec!(40000),
            variable_expenses: dec!(20000),
            savings: dec!(10_000_000),
            debt: Decimal::ZERO,
        });
        engine.run_simulation();
        assert!(engine.calculate_stress_index() > first);
        assert_eq!(engine.calculate_stress_index(), 100);
    }

    #[test]
    fn test_custom_scenario_runs_with_default_weight() {
        let mut engine = engine_with(dec!(1000), dec!(500), dec!(0), dec!(0));
        engine.initialize_scenarios();
        for s in ["base", "income-drop-30", "income-drop-50", "combined-shock"] {
            engine.toggle_scenario(&id(s), false);
        }
        engine.add_scenario(Scenario::new("job-loss", "Job loss", "", dec!(0), dec!(1)));
        engine.run_simulation();

        let result = engine.results().get(&id("job-loss")).unwrap();
        assert_eq!(result.death_month, Some(1));
        assert_eq!(engine.calculate_stress_index(), 0);
    }

    #[test]
    fn test_save_run_prepends_and_caps() {
        let mut engine = engine_with(dec!(100), dec!(10), dec!(0), dec!(0));
        engine.run_simulation();

        let start = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        for i in 0..25 {
            let saved = engine.save_run_at(start + chrono::Duration::seconds(i));
            assert!(saved.persisted);
        }
        let history = engine.history();
        assert_eq!(history.len(), 20);
        assert!(history.windows(2).all(|w| w[0].id > w[1].id));
        assert_eq!(history[0].id, 1_700_000_024_000);

        let stored = engine.history_store().load_history().unwrap();
        assert_eq!(stored, history);
    }

    #[test]
    fn test_save_run_ids_unique_within_same_millisecond() {
        let mut engine = ScenarioEngine::in_memory();
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let a = engine.save_run_at(now).record.id;
        let b = engine.save_run_at(now).record.id;
        assert_eq!(b, a + 1);
    }

    #[test]
    fn test_save_run_summarizes_results() {
        let mut engine = engine_with(dec!(100000), dec!(40000), dec!(20000), dec!(0));
        engine.run_simulation();
        let saved = engine.save_run();

        assert_eq!(saved.record.results.len(), 4);
        assert_eq!(saved.record.stress_index, engine.calculate_stress_index());
        assert_eq!(saved.record.base_data, *engine.base_data());
        let half = &saved.record.results[2];
        assert_eq!(half.id, id("income-drop-50"));
        assert_eq!(half.death_month, Some(1));
        assert!(!half.survived);
    }

    #[test]
    fn test_load_run_restores_base_data_only() {
        let mut engine = engine_with(dec!(100000), dec!(40000), dec!(20000), dec!(0));
        engine.run_simulation();
        let saved = engine.save_run().record;

        engine.set_base_financials(BaseFinancials::default());
        engine.toggle_scenario(&id("base"), false);
        engine.run_simulation();
        let results_before = engine.results().clone();

        let loaded = engine.load_run(saved.id).unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(engine.base_data(), &saved.base_data);
        assert_eq!(engine.results(), &results_before);
        assert!(!engine.scenario(&id("base")).unwrap().enabled);

        assert!(engine.load_run(42).is_none());
    }

    #[test]
    fn test_clear_history() {
        let mut engine = ScenarioEngine::in_memory();
        engine.save_run();
        engine.clear_history();
        assert!(engine.history().is_empty());
        assert!(engine
            .history_store()
            .store()
            .get(crate::storage::history::HISTORY_KEY)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_history_survives_new_engine() {
        let mut engine = engine_with(dec!(100), dec!(10), dec!(0), dec!(0));
        engine.run_simulation();
        let saved = engine.save_run().record;

        let store = KvHistoryStore::new(engine.history_store().store().clone());
        let reopened = ScenarioEngine::new(store);
        assert_eq!(reopened.history(), &[saved]);
    }

    #[test]
    fn test_corrupt_history_loads_empty() {
        let mut kv = MemoryStore::new();
        kv.set(crate::storage::history::HISTORY_KEY, "[{\"broken\"").unwrap();
        let engine = ScenarioEngine::new(KvHistoryStore::new(kv));
        assert!(engine.history().is_empty());
    }

    #[test]
    fn test_broken_store_degrades() {
        let mut engine = ScenarioEngine::new(BrokenStore);
        assert!(engine.history().is_empty());

        engine.run_simulation();
        let saved = engine.save_run();
        assert!(!saved.persisted);
        assert_eq!(engine.history().len(), 1);

        engine.clear_history();
        assert!(engine.history().is_empty());
    }

    #[test]
    fn test_custom_history_limit() {
        let config = EngineConfig {
            history_limit: 3,
            ..Default::default()
        };
        let mut engine = ScenarioEngine::with_config(KvHistoryStore::in_memory(), config);
        for _ in 0..5 {
            engine.save_run();
        }
        assert_eq!(engine.history().len(), 3);
    }

    #[test]
    fn test_diagnose_and_verdicts() {
        let mut engine = engine_with(dec!(1000), dec!(800), dec!(0), dec!(400));
        engine.run_simulation();

        let verdicts = engine.verdicts();
        assert_eq!(verdicts.len(), 4);
        assert_eq!(verdicts[0].scenario_id, id("base"));

        let d = engine.diagnose(&id("income-drop-50")).unwrap();
        assert_eq!(d.income, dec!(500));
        assert_eq!(d.expenses, dec!(800));
        assert!(engine.diagnose(&id("nope")).is_none());
    }

    #[test]
    fn test_reload_history_picks_up_store_changes() {
        let mut engine = ScenarioEngine::in_memory();
        engine.save_run();
        assert_eq!(engine.history().len(), 1);

        engine
            .history_store_mut()
            .store_mut()
            .set(crate::storage::history::HISTORY_KEY, "[]")
            .unwrap();
        assert_eq!(engine.history().len(), 1);
        engine.reload_history();
        assert!(engine.history().is_empty());

        engine
            .history_store_mut()
            .store_mut()
            .set(crate::storage::history::HISTORY_KEY, "{broken")
            .unwrap();
        engine.reload_history();
        assert!(engine.history().is_empty());
    }

    #[test]
    fn test_huge_reserve_survives_every_scenario() {
        let mut engine = ScenarioEngine::in_memory();
        let input: FinancialInput = serde_json::from_value(json!({
            "income": 0,
            "fixedExpenses": 1000,
            "savings": 1e29,
        }))
        .unwrap();
        engine.set_base_data(&input);
        assert_eq!(engine.base_data().savings, Decimal::MAX);

        engine.run_simulation();
        let base = engine.results().get(&id("base")).unwrap();
        assert!(base.survived);
        assert_eq!(base.survival_months, 120);
        assert!(engine.results().iter().all(|r| r.survived));
        assert_eq!(engine.calculate_stress_index(), 100);
    }
}
