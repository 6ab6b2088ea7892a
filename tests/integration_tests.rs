use chrono::{TimeZone, Utc};
use resilience_engine::analysis::diagnosis::Breakdown;
use resilience_engine::analysis::verdict::{ResilienceBand, RiskLevel};
use resilience_engine::core::financials::{BaseFinancials, FinancialInput};
use resilience_engine::core::scenario::{Scenario, ScenarioId};
use resilience_engine::simulation::engine::ScenarioEngine;
use resilience_engine::storage::history::{HistoryStore, KvHistoryStore, HISTORY_KEY};
use resilience_engine::storage::kv::{FileStore, KeyValueStore};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::fs;

fn input(value: Value) -> FinancialInput {
    serde_json::from_value(value).unwrap()
}

fn household() -> FinancialInput {
    input(json!({
        "income": 100000,
        "fixedExpenses": 40000,
        "variableExpenses": 20000,
        "savings": 0,
        "debt": 0
    }))
}

fn id(s: &str) -> ScenarioId {
    ScenarioId::new(s)
}

/// Full pipeline: input form → base data → simulation → verdicts → index → history.
#[test]
fn full_pipeline_household_without_reserve() {
    let mut engine = ScenarioEngine::in_memory();
    engine.set_base_data(&household());
    engine.run_simulation();

    let results = engine.results();
    let ids: Vec<&str> = results.iter().map(|r| r.scenario_id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["base", "income-drop-30", "income-drop-50", "combined-shock"]
    );

    // Base: +40000 every month.
    let base = results.get(&id("base")).unwrap();
    assert!(base.survived);
    assert_eq!(base.survival_months, 120);
    assert_eq!(base.death_month, None);
    assert_eq!(base.monthly_data.len(), 120);

    // -30%: 70000 in, 60000 out.
    let drop30 = results.get(&id("income-drop-30")).unwrap();
    assert!(drop30.survived);

    // -50%: 50000 in, 60000 out, balance -10000 in month 1.
    let drop50 = results.get(&id("income-drop-50")).unwrap();
    assert!(!drop50.survived);
    assert_eq!(drop50.death_month, Some(1));
    assert_eq!(drop50.survival_months, 0);
    assert_eq!(drop50.monthly_data.len(), 1);
    assert_eq!(drop50.monthly_data[0].balance, dec!(-10000));

    // Combined: 60000 in, 72000 out.
    let combined = results.get(&id("combined-shock")).unwrap();
    assert_eq!(combined.death_month, Some(1));

    // (100·1.0 + 100·1.2 + 0·1.5 + 0·1.5) / 5.2 = 42.3
    assert_eq!(engine.calculate_stress_index(), 42);
    assert_eq!(engine.resilience_band(), ResilienceBand::Medium);

    let risks: Vec<RiskLevel> = engine.verdicts().iter().map(|v| v.risk).collect();
    assert_eq!(
        risks,
        vec![
            RiskLevel::Stable,
            RiskLevel::Stable,
            RiskLevel::Critical,
            RiskLevel::Critical
        ]
    );

    let saved = engine.save_run();
    assert!(saved.persisted);
    assert_eq!(saved.record.stress_index, 42);
    assert_eq!(engine.history().len(), 1);
}

#[test]
fn test_zero_net_with_reserve_survives() {
    let mut engine = ScenarioEngine::in_memory();
    engine.set_base_data(&input(json!({
        "income": 100000,
        "fixedExpenses": 30000,
        "variableExpenses": 20000,
        "savings": 100000
    })));
    engine.run_simulation();

    let combined = engine.results().get(&id("combined-shock")).unwrap();
    assert!(combined.survived);
    assert_eq!(combined.survival_months, 120);
    assert!(combined
        .monthly_data
        .iter()
        .all(|m| m.balance == dec!(100000)));
}

#[test]
fn test_zero_net_without_reserve_is_insolvent() {
    let mut engine = ScenarioEngine::in_memory();
    engine.set_base_data(&input(json!({
        "income": 100000,
        "fixedExpenses": 30000,
        "variableExpenses": 20000,
        "savings": 0
    })));
    engine.run_simulation();

    let combined = engine.results().get(&id("combined-shock")).unwrap();
    assert_eq!(combined.death_month, Some(1));
    assert_eq!(combined.monthly_data[0].balance, Decimal::ZERO);
}

#[test]
fn test_composite_index_example() {
    let mut engine = ScenarioEngine::in_memory();
    engine.set_base_data(&household());
    engine.toggle_scenario(&id("income-drop-30"), false);
    engine.toggle_scenario(&id("combined-shock"), false);
    engine.run_simulation();

    assert_eq!(engine.results().len(), 2);
    assert_eq!(engine.calculate_stress_index(), 40);
}

#[test]
fn test_loose_form_input() {
    let mut engine = ScenarioEngine::in_memory();
    engine.set_base_data(&input(json!({
        "income": " 2500.50 ",
        "fixedExpenses": "",
        "variableExpenses": null,
        "savings": "n/a"
    })));

    let base = engine.base_data();
    assert_eq!(base.income, dec!(2500.50));
    assert_eq!(base.total_expenses(), Decimal::ZERO);
    assert_eq!(base.savings, Decimal::ZERO);
    assert_eq!(base.debt, Decimal::ZERO);
    assert_eq!(base.warnings().len(), 1);

    // Zero income, zero expenses, zero reserve: insolvent immediately.
    engine.set_base_data(&FinancialInput::default());
    engine.run_simulation();
    assert!(engine.results().iter().all(|r| r.death_month == Some(1)));
    assert_eq!(engine.calculate_stress_index(), 0);
}

#[test]
fn test_custom_scenario_alongside_canonical() {
    let mut engine = ScenarioEngine::in_memory();
    engine.set_base_data(&input(json!({
        "income": 5000,
        "fixedExpenses": 3000,
        "variableExpenses": 1000,
        "savings": 12000
    })));
    engine.add_scenario(Scenario::from_shock("job-loss", "Job loss", dec!(100), dec!(0)));
    engine.run_simulation();

    assert_eq!(engine.results().len(), 5);
    let job_loss = engine.results().get(&id("job-loss")).unwrap();
    // 12000 reserve, 4000 out per month: 8000, 4000, 0.
    assert_eq!(job_loss.death_month, Some(3));
    assert_eq!(job_loss.survival_months, 2);

    let diagnosis = engine.diagnose(&id("job-loss")).unwrap();
    assert_eq!(diagnosis.breakdown, Breakdown::IncomeGone);
    assert_eq!(diagnosis.runway_months, Some(dec!(3)));
}

#[test]
fn test_persisted_history_shape() {
    let mut engine = ScenarioEngine::in_memory();
    engine.set_base_data(&household());
    engine.toggle_scenario(&id("income-drop-30"), false);
    engine.toggle_scenario(&id("combined-shock"), false);
    engine.run_simulation();
    engine.save_run_at(Utc.timestamp_millis_opt(1_760_434_200_000).unwrap());

    let raw = engine
        .history_store()
        .store()
        .get(HISTORY_KEY)
        .unwrap()
        .unwrap();
    let stored: Value = serde_json::from_str(&raw).unwrap();

    let run = &stored[0];
    assert_eq!(run["id"], json!(1_760_434_200_000i64));
    assert_eq!(run["date"], json!("2025-10-14T09:30:00.000Z"));
    assert_eq!(run["stressIndex"], json!(40));
    assert_eq!(run["baseData"]["income"].as_f64(), Some(100000.0));
    assert_eq!(run["baseData"]["fixedExpenses"].as_f64(), Some(40000.0));
    assert_eq!(run["results"][0]["id"], json!("base"));
    assert_eq!(run["results"][0]["deathMonth"], Value::Null);
    assert_eq!(run["results"][0]["survivalMonths"], json!(120));
    assert_eq!(run["results"][1]["deathMonth"], json!(1));
    assert_eq!(run["results"][1]["survived"], json!(false));
    assert!(run["results"][0].get("monthlyData").is_none());
}

#[test]
fn test_file_store_history_across_sessions() {
    let dir = tempfile::tempdir().unwrap();

    let saved = {
        let mut engine = ScenarioEngine::new(KvHistoryStore::new(FileStore::new(dir.path())));
        engine.set_base_data(&household());
        engine.run_simulation();
        engine.save_run();
        engine.save_run().record
    };

    let mut engine = ScenarioEngine::new(KvHistoryStore::new(FileStore::new(dir.path())));
    assert_eq!(engine.history().len(), 2);
    assert_eq!(engine.history()[0], saved);
    assert!(engine.history()[0].id > engine.history()[1].id);

    // Fresh session: restore the inputs and re-run.
    assert_eq!(engine.base_data(), &BaseFinancials::default());
    engine.load_run(saved.id).unwrap();
    engine.run_simulation();
    assert_eq!(engine.calculate_stress_index(), saved.stress_index);

    engine.clear_history();
    assert!(!dir.path().join(format!("{HISTORY_KEY}.json")).exists());
    let reopened = ScenarioEngine::new(KvHistoryStore::new(FileStore::new(dir.path())));
    assert!(reopened.history().is_empty());
}

#[test]
fn test_corrupt_history_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(format!("{HISTORY_KEY}.json")), "{not json").unwrap();

    let store = KvHistoryStore::new(FileStore::new(dir.path()));
    assert!(store.load_history().is_err());

    let mut engine = ScenarioEngine::new(store);
    assert!(engine.history().is_empty());

    // Saving overwrites the corrupt value.
    engine.set_base_data(&household());
    engine.run_simulation();
    assert!(engine.save_run().persisted);
    assert_eq!(engine.history_store().load_history().unwrap().len(), 1);
}

#[test]
fn test_history_capped_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let start = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

    for session in 0..3 {
        let mut engine = ScenarioEngine::new(KvHistoryStore::new(FileStore::new(dir.path())));
        engine.set_base_data(&household());
        engine.run_simulation();
        for i in 0..9 {
            engine.save_run_at(start + chrono::Duration::minutes(session * 10 + i));
        }
    }

    let engine = ScenarioEngine::new(KvHistoryStore::new(FileStore::new(dir.path())));
    let history = engine.history();
    assert_eq!(history.len(), 20);
    assert!(history.windows(2).all(|w| w[0].id > w[1].id));
    assert_eq!(history[0].date, start + chrono::Duration::minutes(28));
}
