//! Preflight Simulator
//!
//! The single gate before value leaves custody: anything other than a clean
//! `Accepted` from the dry run closes it.

use std::time::Duration;

use tracing::{info, warn};

use crate::chain::CallSubmitter;
use crate::types::{RouterCall, SimulationResult};

pub struct PreflightSimulator {
    timeout: Duration,
}

impl PreflightSimulator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Dry-run `call`. Timeouts and node failures come back as `Rejected`
    /// so the caller never proceeds on an unanswered simulation.
    pub async fn run<C>(&self, chain: &C, call: &RouterCall) -> SimulationResult
    where
        C: CallSubmitter + ?Sized,
    {
        let result = match tokio::time::timeout(self.timeout, chain.simulate(call)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => SimulationResult::Rejected(format!("simulation unavailable: {}", e)),
            Err(_) => SimulationResult::Rejected(format!(
                "simulation timed out after {}ms",
                self.timeout.as_millis()
            )),
        };

        match &result {
            SimulationResult::Accepted => {
                info!("✅ Static call of {} succeeded", call.name());
            }
            SimulationResult::Rejected(reason) => {
                warn!("❌ Static call of {} rejected: {}", call.name(), reason);
            }
        }

        result
    }
}
