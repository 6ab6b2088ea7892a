//! Custom scenario example.
//!
//! Tunes the standard scenarios, adds a job-loss case and compares how a
//! household with a thin reserve and one with a deep reserve hold up.

use resilience_engine::prelude::*;
use rust_decimal_macros::dec;

fn household(savings: rust_decimal::Decimal) -> BaseFinancials {
    BaseFinancials {
        income: dec!(5_000),
        fixed_expenses: dec!(3_000),
        variable_expenses: dec!(1_500),
        savings,
        debt: dec!(10_000),
    }
}

fn main() {
    println!("╔══════════════════════════════════════════════════╗");
    println!("║  resilience-engine: Custom Scenarios Example     ║");
    println!("╚══════════════════════════════════════════════════╝\n");

    let mut engine = ScenarioEngine::in_memory();

    // Harsher combined shock: income -40%, expenses +25%.
    engine.apply_shock(&ScenarioId::from(ScenarioId::COMBINED_SHOCK), dec!(40), dec!(25));
    // No income at all.
    engine.add_scenario(Scenario::from_shock("job-loss", "Job loss", dec!(100), dec!(0)));
    // The -30% case is covered by the combined shock here.
    engine.toggle_scenario(&ScenarioId::from(ScenarioId::INCOME_DROP_30), false);

    for (label, savings) in [("Thin reserve", dec!(2_000)), ("Deep reserve", dec!(40_000))] {
        println!("━━━ {} (savings {}) ━━━\n", label, savings);
        engine.set_base_financials(household(savings));
        engine.run_simulation();

        for verdict in engine.verdicts() {
            println!("{}", verdict);
        }
        println!(
            "Index: {} / 100 ({})",
            engine.calculate_stress_index(),
            engine.resilience_band()
        );

        if let Some(diagnosis) = engine.diagnose(&ScenarioId::new("job-loss")) {
            println!("\nJob loss:");
            print!("{}", diagnosis);
        }
        println!();
        engine.save_run();
    }

    println!("━━━ History (newest first) ━━━\n");
    for run in engine.history() {
        println!("{}", run);
    }
}
