pub mod errors;
pub mod ports;
pub mod reconcile;
pub mod use_cases;
