//! Read-only stages: preflight dry run and gas estimation.
//!
//! Both run the exact call the submitter will later broadcast, against
//! current chain state, and neither commits anything.

mod gas;
mod preflight;

pub use gas::{EstimationFailure, GasEstimator, GAS_MARGIN_DIVISOR};
pub use preflight::PreflightSimulator;
