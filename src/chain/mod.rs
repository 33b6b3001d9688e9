//! Chain capabilities consumed by the pipeline.
//!
//! The pipeline never talks to a node directly. It is handed one value that
//! implements both traits below, bound at construction time to a router, an
//! account and a node.

mod contracts;
mod rpc;

#[cfg(test)]
pub(crate) mod mock;

pub use contracts::{decode_revert, ICustomRouter, IERC20, IUniswapV2Factory, IUniswapV2Router};
pub use rpc::AlloyChain;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use crate::error::ChainError;
use crate::types::{RequestId, RouterCall, SimulationResult};

/// What a single inclusion poll saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    Pending,
    Confirmed { block_number: u64, gas_used: u64 },
    Reverted { block_number: u64, reason: Option<String> },
}

/// Read-only view of chain state for the bound account.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Timestamp of the latest block
    async fn block_timestamp(&self) -> Result<u64, ChainError>;

    /// ERC-20 balance of the bound account
    async fn token_balance(&self, token: Address) -> Result<U256, ChainError>;

    /// Liquidity position (LP tokens of the token/wrapped-native pair) of the bound account
    async fn liquidity_position(&self, token: Address) -> Result<U256, ChainError>;

    /// Live quote: tokens received for `input_value` of native currency
    async fn quote(&self, input_value: U256, token: Address) -> Result<U256, ChainError>;
}

/// Dry-run and write access for router calls.
#[async_trait]
pub trait CallSubmitter: Send + Sync {
    /// Execute the call against current state without committing it.
    ///
    /// A revert is `Ok(Rejected(reason))`; `Err` means the node could not
    /// answer at all.
    async fn simulate(&self, call: &RouterCall) -> Result<SimulationResult, ChainError>;

    async fn estimate_gas(&self, call: &RouterCall) -> Result<u64, ChainError>;

    /// Sign and broadcast. Must not retry internally.
    async fn send(&self, call: &RouterCall, gas_limit: u64) -> Result<RequestId, ChainError>;

    async fn poll_status(&self, request_id: RequestId) -> Result<PollStatus, ChainError>;
}

/// Everything a pipeline instance needs from the chain
pub trait ChainCapability: ChainReader + CallSubmitter {}

impl<T: ChainReader + CallSubmitter + ?Sized> ChainCapability for T {}
