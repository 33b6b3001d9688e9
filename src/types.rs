//! Data model shared by every pipeline stage.

use alloy_primitives::{Address, B256, I256, U256};
use serde::{Deserialize, Serialize};

/// Opaque handle for a broadcast call (the transaction hash).
pub type RequestId = B256;

/// Basis-point denominator (100% = 10_000 bps)
pub const BPS_DENOMINATOR: u32 = 10_000;

// ============================================
// INTENT
// ============================================

/// What the caller wants to happen. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeIntent {
    input_value: U256,
    target_token: Address,
    slippage_bps: u32,
    ttl_seconds: u64,
    /// Extra native currency paired with the swapped tokens into liquidity
    liquidity_value: Option<U256>,
}

impl TradeIntent {
    /// Swap `input_value` of native currency into `target_token`.
    pub fn swap(input_value: U256, target_token: Address, slippage_bps: u32, ttl_seconds: u64) -> Self {
        Self {
            input_value,
            target_token,
            slippage_bps,
            ttl_seconds,
            liquidity_value: None,
        }
    }

    /// Swap, then pair the output with `liquidity_value` more native currency.
    pub fn swap_then_add_liquidity(
        input_value: U256,
        target_token: Address,
        liquidity_value: U256,
        slippage_bps: u32,
        ttl_seconds: u64,
    ) -> Self {
        Self {
            input_value,
            target_token,
            slippage_bps,
            ttl_seconds,
            liquidity_value: Some(liquidity_value),
        }
    }

    pub fn input_value(&self) -> U256 {
        self.input_value
    }

    pub fn target_token(&self) -> Address {
        self.target_token
    }

    pub fn slippage_bps(&self) -> u32 {
        self.slippage_bps
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    pub fn liquidity_value(&self) -> Option<U256> {
        self.liquidity_value
    }

    pub fn adds_liquidity(&self) -> bool {
        self.liquidity_value.is_some()
    }
}

// ============================================
// BOUNDS
// ============================================

/// Minimums for the liquidity leg of a swap-then-add-liquidity call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityBounds {
    pub token_min: U256,
    pub native_min: U256,
    pub native_value: U256,
}

/// Bounds derived once per attempt. Never recomputed after simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedBounds {
    /// Live quote the bounds were derived from
    pub quoted_output: U256,
    pub min_output: U256,
    /// Unix timestamp
    pub deadline: u64,
    pub total_value_required: U256,
    pub liquidity: Option<LiquidityBounds>,
}

// ============================================
// CALL
// ============================================

/// The mutating router call the pipeline guards.
///
/// Built once from an intent and its bounds; simulation, estimation and
/// submission all operate on this exact value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouterCall {
    Swap {
        token: Address,
        amount_out: U256,
        amount_in_max: U256,
        deadline: u64,
    },
    SwapThenAddLiquidity {
        token: Address,
        swap_value: U256,
        expected_token_out: U256,
        token_min: U256,
        native_min: U256,
        liquidity_value: U256,
        deadline: u64,
    },
}

impl RouterCall {
    /// Native currency attached to the call
    pub fn value(&self) -> U256 {
        match self {
            RouterCall::Swap { amount_in_max, .. } => *amount_in_max,
            RouterCall::SwapThenAddLiquidity {
                swap_value,
                liquidity_value,
                ..
            } => swap_value.saturating_add(*liquidity_value),
        }
    }

    pub fn token(&self) -> Address {
        match self {
            RouterCall::Swap { token, .. } | RouterCall::SwapThenAddLiquidity { token, .. } => *token,
        }
    }

    pub fn deadline(&self) -> u64 {
        match self {
            RouterCall::Swap { deadline, .. } | RouterCall::SwapThenAddLiquidity { deadline, .. } => {
                *deadline
            }
        }
    }

    pub fn adds_liquidity(&self) -> bool {
        matches!(self, RouterCall::SwapThenAddLiquidity { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            RouterCall::Swap { .. } => "swapEthForExactTokensExternal",
            RouterCall::SwapThenAddLiquidity { .. } => "swapThenAddLiquidity",
        }
    }
}

// ============================================
// STAGE RESULTS
// ============================================

/// Verdict of the preflight dry run. Never partially valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationResult {
    Accepted,
    /// Decoded revert reason, verbatim
    Rejected(String),
}

impl SimulationResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SimulationResult::Accepted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPlan {
    pub estimated_units: u64,
    pub applied_limit: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    Pending,
    Confirmed,
    Reverted,
    TimedOut,
}

impl SubmissionStatus {
    /// `TimedOut` is inconclusive, so only these two settle an attempt.
    pub fn is_final(&self) -> bool {
        matches!(self, SubmissionStatus::Confirmed | SubmissionStatus::Reverted)
    }
}

/// Lifecycle of one broadcast call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub request_id: RequestId,
    /// Unix timestamp (seconds) of the broadcast
    pub sent_at: u64,
    pub status: SubmissionStatus,
    pub gas_limit: u64,
    pub poll_attempts: u32,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
    pub revert_reason: Option<String>,
}

/// Balances read before submission (and again after confirmation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub token_balance: U256,
    /// Liquidity position (LP token balance); only tracked for liquidity calls
    pub position: Option<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub expected: DerivedBounds,
    pub observed_delta: I256,
    pub satisfied: bool,
    /// Token residual left with the caller after adding liquidity
    pub dust: Option<I256>,
}
