pub mod cashflow;
pub mod engine;
pub mod sampling;
pub mod stress_index;
