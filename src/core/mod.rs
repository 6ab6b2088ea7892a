pub mod financials;
pub mod result;
pub mod scenario;
