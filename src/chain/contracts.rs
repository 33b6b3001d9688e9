//! Router, token and pair ABIs, plus revert decoding.

use alloy_primitives::{hex, Bytes, U256};
use alloy_sol_types::{decode_revert_reason, sol, Revert, SolCall, SolError};

use crate::types::RouterCall;

// ============================================
// SOLIDITY INTERFACES
// ============================================

sol! {
    /// Router whose calls carry their own minimum-output and deadline guards
    #[derive(Debug)]
    interface ICustomRouter {
        function swapEthForExactTokensExternal(
            uint256 amountOut,
            address token,
            uint256 amountInMax,
            uint256 deadline
        ) external payable;

        function swapThenAddLiquidity(
            address token,
            uint256 swapEthAmount,
            uint256 expectedTokenOut,
            uint256 tokenMin,
            uint256 ethMin,
            uint256 additionalEthForLiquidity,
            uint256 deadline
        ) external payable;
    }

    /// UniswapV2-style router used for quotes
    #[derive(Debug)]
    interface IUniswapV2Router {
        function WETH() external pure returns (address);
        function factory() external pure returns (address);
        function getAmountsOut(uint256 amountIn, address[] calldata path)
            external view returns (uint256[] memory amounts);
    }

    #[derive(Debug)]
    interface IUniswapV2Factory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }

    #[derive(Debug)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}

impl RouterCall {
    /// ABI-encoded calldata for the router
    pub fn calldata(&self) -> Bytes {
        let encoded = match self {
            RouterCall::Swap {
                token,
                amount_out,
                amount_in_max,
                deadline,
            } => ICustomRouter::swapEthForExactTokensExternalCall {
                amountOut: *amount_out,
                token: *token,
                amountInMax: *amount_in_max,
                deadline: U256::from(*deadline),
            }
            .abi_encode(),
            RouterCall::SwapThenAddLiquidity {
                token,
                swap_value,
                expected_token_out,
                token_min,
                native_min,
                liquidity_value,
                deadline,
            } => ICustomRouter::swapThenAddLiquidityCall {
                token: *token,
                swapEthAmount: *swap_value,
                expectedTokenOut: *expected_token_out,
                tokenMin: *token_min,
                ethMin: *native_min,
                additionalEthForLiquidity: *liquidity_value,
                deadline: U256::from(*deadline),
            }
            .abi_encode(),
        };
        encoded.into()
    }
}

pub(crate) const NODE_REVERT_PREFIX: &str = "execution reverted";

/// Turn revert data (or, without data, the node's message) into a reason string.
///
/// `Error(string)` yields the bare string, so `INSUFFICIENT_OUTPUT_AMOUNT`
/// comes back exactly as the contract wrote it.
pub fn decode_revert(data: Option<&[u8]>, message: &str) -> String {
    if let Some(data) = data.filter(|d| !d.is_empty()) {
        if let Ok(revert) = Revert::abi_decode(data) {
            return revert.reason;
        }
        if let Some(reason) = decode_revert_reason(data) {
            return reason;
        }
        return format!("0x{}", hex::encode(data));
    }

    match message.strip_prefix(NODE_REVERT_PREFIX) {
        Some(rest) => {
            let rest = rest.trim_start_matches(':').trim();
            if rest.is_empty() {
                NODE_REVERT_PREFIX.to_string()
            } else {
                rest.to_string()
            }
        }
        None => message.to_string(),
    }
}
