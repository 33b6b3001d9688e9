//! Alloy-backed chain capability.
//!
//! One instance is bound to one node, one router and one signing account.
//! The provider's wallet filler signs; nonce, chain id and fees are filled by
//! the recommended fillers.

use alloy_consensus::Transaction as _;
use alloy_eips::{BlockId, BlockNumberOrTag};
use alloy_network::{Ethereum, EthereumWallet, ReceiptResponse};
use alloy_primitives::{Address, Bytes, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolCall;
use alloy_transport::TransportError;
use async_trait::async_trait;
use tracing::{debug, info};

use super::contracts::{
    decode_revert, IUniswapV2Factory, IUniswapV2Router, IERC20, NODE_REVERT_PREFIX,
};
use super::{CallSubmitter, ChainReader, PollStatus};
use crate::config::PipelineConfig;
use crate::error::ChainError;
use crate::types::{RequestId, RouterCall, SimulationResult};

/// Map an RPC failure. Only responses carrying revert data or the node's
/// "execution reverted" message are reverts; every other error response
/// (funds, nonce, missing header, ...) is a node failure.
fn classify(err: TransportError) -> ChainError {
    match err.as_error_resp() {
        Some(payload) => {
            let data = payload.as_revert_data();
            from_error_response(data.as_ref().map(|d| &d[..]), &payload.message)
        }
        None => ChainError::Transport(err.to_string()),
    }
}

fn from_error_response(revert_data: Option<&[u8]>, message: &str) -> ChainError {
    let has_data = revert_data.is_some_and(|d| !d.is_empty());

    if has_data || message.starts_with(NODE_REVERT_PREFIX) {
        ChainError::Reverted {
            reason: decode_revert(revert_data, message),
        }
    } else {
        ChainError::Transport(message.to_string())
    }
}

pub struct AlloyChain {
    provider: DynProvider<Ethereum>,
    /// Router executing the guarded calls
    router: Address,
    /// V2-style router used for quotes and pair lookup
    quote_router: Address,
    wrapped_native: Address,
    factory: Address,
    account: Address,
}

impl AlloyChain {
    /// Connect to `rpc_url` and bind the router and signing account.
    ///
    /// The wrapped-native token and pair factory are resolved here, once.
    pub async fn connect(
        rpc_url: &str,
        chain_id: u64,
        router: Address,
        quote_router: Address,
        signer: PrivateKeySigner,
    ) -> Result<Self, ChainError> {
        let signer = signer.with_chain_id(Some(chain_id));
        let account = signer.address();

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect(rpc_url)
            .await
            .map_err(|e| ChainError::Transport(format!("failed to connect to {}: {}", rpc_url, e)))?
            .erased();

        let mut chain = Self {
            provider,
            router,
            quote_router,
            wrapped_native: Address::ZERO,
            factory: Address::ZERO,
            account,
        };

        let out = chain
            .view(quote_router, IUniswapV2Router::WETHCall {}.abi_encode())
            .await?;
        chain.wrapped_native = IUniswapV2Router::WETHCall::abi_decode_returns(&out)
            .map_err(|e| ChainError::Decode(format!("WETH(): {}", e)))?;

        let out = chain
            .view(quote_router, IUniswapV2Router::factoryCall {}.abi_encode())
            .await?;
        chain.factory = IUniswapV2Router::factoryCall::abi_decode_returns(&out)
            .map_err(|e| ChainError::Decode(format!("factory(): {}", e)))?;

        info!(
            "Chain bound: account {:?}, router {:?}, wrapped native {:?}",
            account, router, chain.wrapped_native
        );

        Ok(chain)
    }

    /// Connect using the addresses in `config`.
    pub async fn from_config(config: &PipelineConfig, signer: PrivateKeySigner) -> Result<Self, ChainError> {
        Self::connect(
            &config.rpc_url,
            config.chain_id,
            config.router_address,
            config.quote_router_address,
            signer,
        )
        .await
    }

    pub fn account(&self) -> Address {
        self.account
    }

    async fn view(&self, to: Address, calldata: Vec<u8>) -> Result<Bytes, ChainError> {
        let tx = TransactionRequest::default()
            .to(to)
            .input(Bytes::from(calldata).into());

        self.provider.call(tx).await.map_err(classify)
    }

    fn router_request(&self, call: &RouterCall) -> TransactionRequest {
        TransactionRequest::default()
            .from(self.account)
            .to(self.router)
            .value(call.value())
            .input(call.calldata().into())
    }

    async fn pair_for(&self, token: Address) -> Result<Address, ChainError> {
        let calldata = IUniswapV2Factory::getPairCall {
            tokenA: token,
            tokenB: self.wrapped_native,
        }
        .abi_encode();
        let out = self.view(self.factory, calldata).await?;

        IUniswapV2Factory::getPairCall::abi_decode_returns(&out)
            .map_err(|e| ChainError::Decode(format!("getPair(): {}", e)))
    }

    /// Best-effort reason for a mined revert: replay the call on the parent block.
    async fn replay_revert(&self, request_id: RequestId, block_number: u64) -> Option<String> {
        let tx = self.provider.get_transaction_by_hash(request_id).await.ok()??;

        let replay = TransactionRequest::default()
            .from(self.account)
            .to(self.router)
            .value(tx.value())
            .input(tx.input().clone().into());

        match self
            .provider
            .call(replay)
            .block(BlockId::number(block_number.saturating_sub(1)))
            .await
        {
            Ok(_) => None,
            Err(err) => match classify(err) {
                ChainError::Reverted { reason } => Some(reason),
                _ => None,
            },
        }
    }
}

#[async_trait]
impl ChainReader for AlloyChain {
    async fn block_timestamp(&self) -> Result<u64, ChainError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .map_err(classify)?
            .ok_or_else(|| ChainError::Unavailable("latest block".to_string()))?;

        Ok(block.header.timestamp)
    }

    async fn token_balance(&self, token: Address) -> Result<U256, ChainError> {
        let calldata = IERC20::balanceOfCall {
            account: self.account,
        }
        .abi_encode();
        let out = self.view(token, calldata).await?;

        IERC20::balanceOfCall::abi_decode_returns(&out)
            .map_err(|e| ChainError::Decode(format!("balanceOf(): {}", e)))
    }

    async fn liquidity_position(&self, token: Address) -> Result<U256, ChainError> {
        let pair = self.pair_for(token).await?;
        if pair == Address::ZERO {
            // No pool yet: the position starts at zero
            return Ok(U256::ZERO);
        }

        self.token_balance(pair).await
    }

    async fn quote(&self, input_value: U256, token: Address) -> Result<U256, ChainError> {
        let calldata = IUniswapV2Router::getAmountsOutCall {
            amountIn: input_value,
            path: vec![self.wrapped_native, token],
        }
        .abi_encode();
        let out = self.view(self.quote_router, calldata).await?;

        let amounts = IUniswapV2Router::getAmountsOutCall::abi_decode_returns(&out)
            .map_err(|e| ChainError::Decode(format!("getAmountsOut(): {}", e)))?;

        amounts
            .last()
            .copied()
            .ok_or_else(|| ChainError::Decode("getAmountsOut() returned no amounts".to_string()))
    }
}

#[async_trait]
impl CallSubmitter for AlloyChain {
    async fn simulate(&self, call: &RouterCall) -> Result<SimulationResult, ChainError> {
        debug!("eth_call {} (value {})", call.name(), call.value());

        match self.provider.call(self.router_request(call)).await {
            Ok(_) => Ok(SimulationResult::Accepted),
            Err(err) => match classify(err) {
                ChainError::Reverted { reason } => Ok(SimulationResult::Rejected(reason)),
                other => Err(other),
            },
        }
    }

    async fn estimate_gas(&self, call: &RouterCall) -> Result<u64, ChainError> {
        self.provider
            .estimate_gas(self.router_request(call))
            .await
            .map_err(classify)
    }

    async fn send(&self, call: &RouterCall, gas_limit: u64) -> Result<RequestId, ChainError> {
        let request = self.router_request(call).gas_limit(gas_limit);

        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(classify)?;

        Ok(*pending.tx_hash())
    }

    async fn poll_status(&self, request_id: RequestId) -> Result<PollStatus, ChainError> {
        let receipt = self
            .provider
            .get_transaction_receipt(request_id)
            .await
            .map_err(classify)?;

        let Some(receipt) = receipt else {
            return Ok(PollStatus::Pending);
        };

        let block_number = receipt.block_number().unwrap_or_default();
        if receipt.status() {
            Ok(PollStatus::Confirmed {
                block_number,
                gas_used: receipt.gas_used(),
            })
        } else {
            let reason = self.replay_revert(request_id, block_number).await;
            Ok(PollStatus::Reverted {
                block_number,
                reason,
            })
        }
    }
}
