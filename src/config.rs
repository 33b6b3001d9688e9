//! Pipeline Configuration
//!
//! Network binding, stage timeouts and polling bounds for one pipeline
//! instance. Loaded from the environment (with `.env` support) or TOML.

use alloy_primitives::{address, Address, U256};
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::executor::PollPolicy;
use crate::types::{TradeIntent, BPS_DENOMINATOR};

// ============================================
// DEFAULTS
// ============================================

/// Local fork of BSC mainnet
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_CHAIN_ID: u64 = 56;

/// PancakeSwap V2 router (BSC), used for quotes and pair lookup
pub const PANCAKE_V2_ROUTER: Address = address!("10ED43C718714eb63d5aA57B78B54704E256024E");

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    // ========== Network Settings ==========
    pub rpc_url: String,

    pub chain_id: u64,

    /// Deployed router that executes the guarded calls. No usable default.
    pub router_address: Address,

    /// V2-style router queried for `getAmountsOut`, `WETH()` and `factory()`
    pub quote_router_address: Address,

    // ========== Stage Timeouts ==========
    pub simulation_timeout_secs: u64,

    pub estimation_timeout_secs: u64,

    /// Bound on each state read (quote, block time, balance snapshots)
    pub read_timeout_ms: u64,

    // ========== Inclusion Polling ==========
    pub poll_interval_ms: u64,

    /// Polls before an attempt is reported as timed out
    pub max_poll_attempts: u32,

    /// Wall-clock bound on one polling session
    pub poll_budget_secs: u64,

    // ========== Intent Defaults ==========
    pub default_slippage_bps: u32,

    pub default_ttl_secs: u64,

    // ========== Outcome Journal ==========
    /// Append every terminal outcome as a JSON line
    pub outcome_log: bool,

    pub outcome_log_path: String,
}

impl PipelineConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            // Network
            rpc_url: env::var("RPC_URL").unwrap_or(defaults.rpc_url),
            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| DEFAULT_CHAIN_ID.to_string())
                .parse()
                .unwrap_or(DEFAULT_CHAIN_ID),
            router_address: match env::var("ROUTER_ADDRESS") {
                Ok(s) => Address::from_str(s.trim())
                    .map_err(|e| eyre::eyre!("Invalid ROUTER_ADDRESS {}: {}", s, e))?,
                Err(_) => defaults.router_address,
            },
            quote_router_address: match env::var("QUOTE_ROUTER_ADDRESS") {
                Ok(s) => Address::from_str(s.trim())
                    .map_err(|e| eyre::eyre!("Invalid QUOTE_ROUTER_ADDRESS {}: {}", s, e))?,
                Err(_) => defaults.quote_router_address,
            },

            // Timeouts
            simulation_timeout_secs: env::var("SIMULATION_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .unwrap_or(15),
            estimation_timeout_secs: env::var("ESTIMATION_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .unwrap_or(15),
            read_timeout_ms: env::var("READ_TIMEOUT_MS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .unwrap_or(10_000),

            // Polling
            poll_interval_ms: env::var("POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            max_poll_attempts: env::var("MAX_POLL_ATTEMPTS")
                .unwrap_or_else(|_| "40".to_string())
                .parse()
                .unwrap_or(40),
            poll_budget_secs: env::var("POLL_BUDGET_SECS")
                .unwrap_or_else(|_| "180".to_string())
                .parse()
                .unwrap_or(180),

            // Intent defaults
            default_slippage_bps: env::var("DEFAULT_SLIPPAGE_BPS")
                .unwrap_or_else(|_| "500".to_string())
                .parse()
                .unwrap_or(500),
            default_ttl_secs: env::var("DEFAULT_TTL_SECS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .unwrap_or(600),

            // Journal
            outcome_log: env::var("OUTCOME_LOG")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            outcome_log_path: env::var("OUTCOME_LOG_PATH").unwrap_or(defaults.outcome_log_path),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate before binding a chain
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() || self.rpc_url.contains("YOUR_API_KEY") {
            return Err(eyre::eyre!("Invalid RPC_URL - please set a reachable node URL"));
        }

        if self.router_address == Address::ZERO {
            return Err(eyre::eyre!("ROUTER_ADDRESS is not set (deploy the router first)"));
        }
        if self.quote_router_address == Address::ZERO {
            return Err(eyre::eyre!("QUOTE_ROUTER_ADDRESS is not set"));
        }

        if self.max_poll_attempts == 0 || self.poll_budget_secs == 0 {
            return Err(eyre::eyre!(
                "Polling needs at least one attempt and a non-zero budget \
                 (MAX_POLL_ATTEMPTS={}, POLL_BUDGET_SECS={})",
                self.max_poll_attempts,
                self.poll_budget_secs
            ));
        }

        if self.read_timeout_ms == 0 {
            return Err(eyre::eyre!("READ_TIMEOUT_MS must be positive"));
        }

        if self.default_slippage_bps >= BPS_DENOMINATOR {
            return Err(eyre::eyre!(
                "DEFAULT_SLIPPAGE_BPS must be below {} (currently {})",
                BPS_DENOMINATOR,
                self.default_slippage_bps
            ));
        }
        if self.default_ttl_secs == 0 {
            return Err(eyre::eyre!("DEFAULT_TTL_SECS must be positive"));
        }

        Ok(())
    }

    /// Swap intent using the configured slippage and TTL
    pub fn swap_intent(&self, input_value: U256, target_token: Address) -> TradeIntent {
        TradeIntent::swap(
            input_value,
            target_token,
            self.default_slippage_bps,
            self.default_ttl_secs,
        )
    }

    /// Swap-then-add-liquidity intent using the configured slippage and TTL
    pub fn liquidity_intent(
        &self,
        input_value: U256,
        target_token: Address,
        liquidity_value: U256,
    ) -> TradeIntent {
        TradeIntent::swap_then_add_liquidity(
            input_value,
            target_token,
            liquidity_value,
            self.default_slippage_bps,
            self.default_ttl_secs,
        )
    }

    pub fn simulation_timeout(&self) -> Duration {
        Duration::from_secs(self.simulation_timeout_secs)
    }

    pub fn estimation_timeout(&self) -> Duration {
        Duration::from_secs(self.estimation_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_poll_attempts,
            budget: Duration::from_secs(self.poll_budget_secs),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            router_address: Address::ZERO,
            quote_router_address: PANCAKE_V2_ROUTER,
            simulation_timeout_secs: 15,
            estimation_timeout_secs: 15,
            read_timeout_ms: 10_000,
            poll_interval_ms: 3000,
            max_poll_attempts: 40,
            poll_budget_secs: 180,
            default_slippage_bps: 500,
            default_ttl_secs: 600,
            outcome_log: false,
            outcome_log_path: "./logs/outcomes.log".to_string(),
        }
    }
}

// ============================================
// TESTS
// ============================================
