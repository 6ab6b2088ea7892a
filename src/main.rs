//! resilience-engine CLI
//!
//! Run financial stress tests from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Stress-test the finances in a JSON file
//! resilience-engine run --input finances.json
//!
//! # Tweak scenarios, output JSON and keep the run in history
//! resilience-engine run --input finances.json --shock combined-shock=40,20 --format json --save
//!
//! # Inspect and reload history
//! resilience-engine history
//! resilience-engine load --id 1760434200000
//!
//! # Generate random inputs for testing
//! resilience-engine generate --count 5
//! ```

use resilience_engine::analysis::diagnosis::Diagnosis;
use resilience_engine::analysis::verdict::{ResilienceBand, RiskLevel};
use resilience_engine::core::financials::{BaseFinancials, FinancialInput};
use resilience_engine::core::scenario::ScenarioId;
use resilience_engine::simulation::engine::ScenarioEngine;
use resilience_engine::simulation::sampling::{generate_random_financials, FinancialsConfig};
use resilience_engine::storage::history::{HistoryStore, KvHistoryStore};
use resilience_engine::storage::kv::FileStore;
use resilience_engine::storage::run_record::RunRecord;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs;
use std::process;

const DEFAULT_STORE_DIR: &str = ".resilience-engine";

/// Months shown in the text preview table.
const PREVIEW_MONTHS: usize = 12;

fn print_usage() {
    eprintln!(
        r#"resilience-engine — deterministic financial stress testing

USAGE:
    resilience-engine <COMMAND> [OPTIONS]

COMMANDS:
    run         Simulate all enabled scenarios for a set of finances
    history     List saved runs
    load        Restore a saved run's inputs and simulate again
    clear       Delete all saved runs
    generate    Generate random finances (for testing)
    help        Show this message

OPTIONS (run):
    --input <FILE>              Path to JSON finances file
    --format <FORMAT>           Output format: text (default) or json
    --disable <ID>              Skip a scenario (repeatable)
    --factors <ID>=<INC>,<EXP>  Set a scenario's income/expense factors (repeatable)
    --shock <ID>=<DROP>,<RISE>  Set a scenario from percentages (repeatable)
    --save                      Add the run to history
    --store <DIR>               History directory (default: .resilience-engine)

OPTIONS (history, load, clear):
    --store <DIR>               History directory (default: .resilience-engine)
    --format <FORMAT>           Output format: text (default) or json
    --id <N>                    Run id (load only)

OPTIONS (generate):
    --count <N>                 Number of samples (default: 10)
    --output <FILE>             Write to file instead of stdout

SCENARIOS:
    base, income-drop-30, income-drop-50, combined-shock

EXAMPLES:
    resilience-engine run --input finances.json
    resilience-engine run --input finances.json --disable base --factors income-drop-30=0.8,1.0
    resilience-engine run --input finances.json --format json --save
    resilience-engine history --store ./runs
    resilience-engine load --id 1760434200000
    resilience-engine generate --count 5 --output samples.json"#
    );
}

type Engine = ScenarioEngine<KvHistoryStore<FileStore>>;

fn open_engine(store_dir: &str) -> Engine {
    ScenarioEngine::new(KvHistoryStore::new(FileStore::new(store_dir)))
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}

fn next_value(args: &[String], i: &mut usize, flag: &str, what: &str) -> String {
    *i += 1;
    args.get(*i)
        .cloned()
        .unwrap_or_else(|| fail(format!("{} requires {}", flag, what)))
}

fn parse_decimal(raw: &str, flag: &str) -> Decimal {
    raw.trim()
        .parse()
        .unwrap_or_else(|e| fail(format!("Invalid number '{}' for {}: {}", raw, flag, e)))
}

/// Parse `<ID>=<A>,<B>`.
fn parse_pair(raw: &str, flag: &str) -> (ScenarioId, Decimal, Decimal) {
    let (id, values) = raw
        .split_once('=')
        .unwrap_or_else(|| fail(format!("{} expects <ID>=<A>,<B>, got '{}'", flag, raw)));
    let (a, b) = values
        .split_once(',')
        .unwrap_or_else(|| fail(format!("{} expects <ID>=<A>,<B>, got '{}'", flag, raw)));
    (
        ScenarioId::new(id.trim()),
        parse_decimal(a, flag),
        parse_decimal(b, flag),
    )
}

fn load_input(path: &str) -> FinancialInput {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| fail(format!("Error reading file '{}': {}", path, e)));

    serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        eprintln!("Expected format:");
        eprintln!(
            r#"{{
  "income": 100000,
  "fixedExpenses": 40000,
  "variableExpenses": 20000,
  "savings": 150000,
  "debt": 0
}}"#
        );
        process::exit(1);
    })
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| fail(format!("Error serializing output: {}", e)))
}

/// JSON output schema for a run.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunOutput {
    base_data: BaseFinancials,
    scenarios: Vec<ScenarioOutput>,
    stress_index: u8,
    band: ResilienceBand,
    saved_run_id: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScenarioOutput {
    id: String,
    name: String,
    income_factor: String,
    expense_factor: String,
    survival_months: u32,
    death_month: Option<u32>,
    survived: bool,
    risk: RiskLevel,
    final_balance: Option<String>,
    diagnosis: Option<Diagnosis>,
}

fn print_report(engine: &Engine, format: &str, saved_run_id: Option<i64>) {
    let index = engine.calculate_stress_index();
    let band = ResilienceBand::from_index(index);

    if format == "json" {
        let scenarios = engine
            .results()
            .iter()
            .map(|result| {
                let scenario = engine.scenario(&result.scenario_id);
                ScenarioOutput {
                    id: result.scenario_id.to_string(),
                    name: result.scenario_name.clone(),
                    income_factor: scenario
                        .map(|s| s.income_factor.to_string())
                        .unwrap_or_default(),
                    expense_factor: scenario
                        .map(|s| s.expense_factor.to_string())
                        .unwrap_or_default(),
                    survival_months: result.survival_months,
                    death_month: result.death_month,
                    survived: result.survived,
                    risk: RiskLevel::from_survival_months(result.survival_months),
                    final_balance: result.final_balance().map(|b| b.round_dp(2).to_string()),
                    diagnosis: engine.diagnose(&result.scenario_id),
                }
            })
            .collect();

        let output = RunOutput {
            base_data: *engine.base_data(),
            scenarios,
            stress_index: index,
            band,
            saved_run_id,
        };
        println!("{}", to_json(&output));
        return;
    }

    println!("=== Base Data ===");
    println!("{}\n", engine.base_data());
    print!("{}", engine.results());

    println!("\n=== Verdicts ===");
    for verdict in engine.verdicts() {
        println!("{}", verdict);
    }

    for result in engine.results() {
        println!("\n--- {}: first months ---", result.scenario_name);
        println!("  {:>5}  {:>14}  {:>14}  {:>16}", "Month", "Income", "Expenses", "Balance");
        for month in result.first_months(PREVIEW_MONTHS) {
            println!(
                "  {:>5}  {:>14}  {:>14}  {:>16}{}",
                month.month,
                month.income.round_dp(2),
                month.expenses.round_dp(2),
                month.balance.round_dp(2),
                if month.is_negative { "  ✗" } else { "" }
            );
        }
        if let Some(diagnosis) = engine.diagnose(&result.scenario_id) {
            print!("{}", diagnosis);
        }
    }

    println!("\n=== Stress Index ===");
    println!("Index: {} / 100 ({})", index, band);
    println!("{}", band.summary());
    if let Some(id) = saved_run_id {
        println!("\nSaved as run {}", id);
    }
}

fn cmd_run(args: &[String]) {
    let mut input_path = None;
    let mut format = "text".to_string();
    let mut store_dir = DEFAULT_STORE_DIR.to_string();
    let mut save = false;
    let mut disabled = Vec::new();
    let mut factors = Vec::new();
    let mut shocks = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => input_path = Some(next_value(args, &mut i, "--input", "a file path")),
            "--format" => format = next_value(args, &mut i, "--format", "'text' or 'json'"),
            "--store" => store_dir = next_value(args, &mut i, "--store", "a directory"),
            "--disable" => disabled.push(next_value(args, &mut i, "--disable", "a scenario id")),
            "--factors" => {
                let raw = next_value(args, &mut i, "--factors", "<ID>=<INCOME>,<EXPENSE>");
                factors.push(parse_pair(&raw, "--factors"));
            }
            "--shock" => {
                let raw = next_value(args, &mut i, "--shock", "<ID>=<DROP%>,<RISE%>");
                shocks.push(parse_pair(&raw, "--shock"));
            }
            "--save" => save = true,
            _ => fail(format!("Unknown option: {}", args[i])),
        }
        i += 1;
    }

    let path = input_path.unwrap_or_else(|| fail("Error: --input <FILE> is required"));
    let input = load_input(&path);

    let mut engine = open_engine(&store_dir);
    engine.set_base_data(&input);
    for warning in engine.base_data().warnings() {
        log::warn!("input: {}", warning);
    }

    for (id, income_factor, expense_factor) in factors {
        if engine.scenario(&id).is_none() {
            log::warn!("--factors: unknown scenario '{}' ignored", id);
        }
        engine.update_scenario(&id, income_factor, expense_factor);
    }
    for (id, drop, rise) in shocks {
        if engine.scenario(&id).is_none() {
            log::warn!("--shock: unknown scenario '{}' ignored", id);
        }
        engine.apply_shock(&id, drop, rise);
    }
    for id in disabled {
        engine.toggle_scenario(&ScenarioId::new(id), false);
    }

    engine.run_simulation();

    let saved_run_id = if save {
        let saved = engine.save_run();
        if !saved.persisted {
            eprintln!("Warning: run could not be written to '{}'", store_dir);
        }
        Some(saved.record.id)
    } else {
        None
    };

    print_report(&engine, &format, saved_run_id);
}

fn parse_store_args(args: &[String], allow_id: bool) -> (String, String, Option<i64>) {
    let mut store_dir = DEFAULT_STORE_DIR.to_string();
    let mut format = "text".to_string();
    let mut id = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--store" => store_dir = next_value(args, &mut i, "--store", "a directory"),
            "--format" => format = next_value(args, &mut i, "--format", "'text' or 'json'"),
            "--id" if allow_id => {
                let raw = next_value(args, &mut i, "--id", "a run id");
                id = Some(
                    raw.parse()
                        .unwrap_or_else(|_| fail(format!("Invalid run id '{}'", raw))),
                );
            }
            _ => fail(format!("Unknown option: {}", args[i])),
        }
        i += 1;
    }
    (store_dir, format, id)
}

fn print_history(history: &[RunRecord], format: &str) {
    if format == "json" {
        println!("{}", to_json(&history));
        return;
    }
    if history.is_empty() {
        println!("History is empty. Run a stress test with --save first.");
        return;
    }
    for run in history {
        println!("{}  [{}]", run, ResilienceBand::from_index(run.stress_index));
    }
}

fn cmd_history(args: &[String]) {
    let (store_dir, format, _) = parse_store_args(args, false);
    let engine = open_engine(&store_dir);
    print_history(engine.history(), &format);
}

fn cmd_load(args: &[String]) {
    let (store_dir, format, id) = parse_store_args(args, true);
    let id = id.unwrap_or_else(|| fail("Error: --id <N> is required"));

    let mut engine = open_engine(&store_dir);
    if engine.load_run(id).is_none() {
        fail(format!("No saved run with id {}", id));
    }
    engine.run_simulation();
    print_report(&engine, &format, None);
}

fn cmd_clear(args: &[String]) {
    let (store_dir, _, _) = parse_store_args(args, false);
    let mut engine = open_engine(&store_dir);
    let count = engine.history().len();
    engine.clear_history();

    match engine.history_store().load_history() {
        Ok(history) if history.is_empty() => println!("Cleared {} saved runs.", count),
        _ => fail(format!("Could not clear history in '{}'", store_dir)),
    }
}

fn cmd_generate(args: &[String]) {
    let mut count = 10usize;
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--count" => {
                let raw = next_value(args, &mut i, "--count", "a number");
                count = raw
                    .parse()
                    .unwrap_or_else(|_| fail("--count requires a number"));
            }
            "--output" => output_path = Some(next_value(args, &mut i, "--output", "a file path")),
            _ => fail(format!("Unknown option: {}", args[i])),
        }
        i += 1;
    }

    let config = FinancialsConfig {
        count,
        ..Default::default()
    };
    let samples = generate_random_financials(&config);
    let json = to_json(&samples);

    if let Some(path) = output_path {
        fs::write(&path, &json)
            .unwrap_or_else(|e| fail(format!("Error writing to '{}': {}", path, e)));
        eprintln!("Generated {} samples → {}", samples.len(), path);
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "run" => cmd_run(rest),
        "history" => cmd_history(rest),
        "load" => cmd_load(rest),
        "clear" => cmd_clear(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
