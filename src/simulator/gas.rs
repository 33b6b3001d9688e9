//! Gas Estimator
//!
//! Estimates against current state and pads the result by a fixed 50%:
//! estimation and inclusion happen at different blocks.

use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::chain::CallSubmitter;
use crate::error::ChainError;
use crate::types::{GasPlan, RouterCall};

/// `applied_limit = estimate + estimate / GAS_MARGIN_DIVISOR`. Not configurable.
pub const GAS_MARGIN_DIVISOR: u64 = 2;

impl GasPlan {
    pub fn from_estimate(estimated_units: u64) -> Self {
        Self {
            estimated_units,
            applied_limit: estimated_units.saturating_add(estimated_units / GAS_MARGIN_DIVISOR),
        }
    }
}

/// Why no gas plan could be produced
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EstimationFailure {
    /// The call reverts under estimation: state moved since simulation
    #[error("estimation reverted: {0}")]
    Reverted(String),

    #[error("estimation unavailable: {0}")]
    Unavailable(String),

    #[error("estimation timed out after {0:?}")]
    TimedOut(Duration),
}

pub struct GasEstimator {
    timeout: Duration,
}

impl GasEstimator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn estimate<C>(&self, chain: &C, call: &RouterCall) -> Result<GasPlan, EstimationFailure>
    where
        C: CallSubmitter + ?Sized,
    {
        let units = match tokio::time::timeout(self.timeout, chain.estimate_gas(call)).await {
            Ok(Ok(units)) => units,
            Ok(Err(ChainError::Reverted { reason })) => {
                warn!("Gas estimation for {} reverted: {}", call.name(), reason);
                return Err(EstimationFailure::Reverted(reason));
            }
            Ok(Err(e)) => {
                warn!("Gas estimation for {} failed: {}", call.name(), e);
                return Err(EstimationFailure::Unavailable(e.to_string()));
            }
            Err(_) => {
                warn!("Gas estimation for {} timed out", call.name());
                return Err(EstimationFailure::TimedOut(self.timeout));
            }
        };

        let plan = GasPlan::from_estimate(units);
        info!(
            "⛽ Gas estimate {} units, applied limit {}",
            plan.estimated_units, plan.applied_limit
        );

        Ok(plan)
    }
}
