//! Quantity Calculator
//!
//! Derives the minimum output, deadline and attached value for an attempt
//! from the intent and a live quote. Pure: the quote and chain time are
//! passed in, nothing is read here.

use alloy_primitives::U256;
use tracing::debug;

use crate::error::IntentError;
use crate::types::{DerivedBounds, LiquidityBounds, RouterCall, TradeIntent, BPS_DENOMINATOR};

/// Reject intents that must never reach the chain.
pub fn validate_intent(intent: &TradeIntent) -> Result<(), IntentError> {
    if intent.ttl_seconds() == 0 {
        return Err(IntentError::InvalidIntent(
            "ttl_seconds must be positive".to_string(),
        ));
    }
    if intent.slippage_bps() >= BPS_DENOMINATOR {
        return Err(IntentError::InvalidIntent(format!(
            "slippage of {} bps leaves no minimum output",
            intent.slippage_bps()
        )));
    }
    if intent.input_value().is_zero() {
        return Err(IntentError::InvalidIntent(
            "input value must be non-zero".to_string(),
        ));
    }
    Ok(())
}

/// `amount * (10000 - bps) / 10000` in checked integer arithmetic
pub fn apply_slippage(amount: U256, slippage_bps: u32) -> Result<U256, IntentError> {
    let keep = BPS_DENOMINATOR
        .checked_sub(slippage_bps)
        .ok_or_else(|| IntentError::InvalidIntent(format!("slippage {} bps exceeds 100%", slippage_bps)))?;

    amount
        .checked_mul(U256::from(keep))
        .map(|scaled| scaled / U256::from(BPS_DENOMINATOR))
        .ok_or(IntentError::ArithmeticOverflow("slippage-adjusted minimum"))
}

/// Derive the bounds for one attempt.
///
/// `quoted_output` must come from a live quote; a zero quote is treated as
/// "no quote" rather than a legitimate expectation of nothing.
pub fn derive_bounds(
    intent: &TradeIntent,
    quoted_output: U256,
    chain_time: u64,
) -> Result<DerivedBounds, IntentError> {
    validate_intent(intent)?;

    if quoted_output.is_zero() {
        return Err(IntentError::InvalidIntent(
            "no live quote for target token".to_string(),
        ));
    }

    let min_output = apply_slippage(quoted_output, intent.slippage_bps())?;
    if min_output.is_zero() {
        return Err(IntentError::InvalidIntent(format!(
            "quote of {} rounds to a zero minimum at {} bps",
            quoted_output,
            intent.slippage_bps()
        )));
    }

    let deadline = chain_time
        .checked_add(intent.ttl_seconds())
        .ok_or(IntentError::ArithmeticOverflow("deadline"))?;

    let (total_value_required, liquidity) = match intent.liquidity_value() {
        Some(native_value) => {
            let total = intent
                .input_value()
                .checked_add(native_value)
                .ok_or(IntentError::ArithmeticOverflow("total value"))?;
            let native_min = apply_slippage(native_value, intent.slippage_bps())?;
            (
                total,
                Some(LiquidityBounds {
                    token_min: min_output,
                    native_min,
                    native_value,
                }),
            )
        }
        None => (intent.input_value(), None),
    };

    debug!(
        "Bounds for {:?}: quote {}, min {}, deadline {}, value {}",
        intent.target_token(),
        quoted_output,
        min_output,
        deadline,
        total_value_required
    );

    Ok(DerivedBounds {
        quoted_output,
        min_output,
        deadline,
        total_value_required,
        liquidity,
    })
}

/// The single router call an attempt will simulate, estimate and send.
pub fn build_call(intent: &TradeIntent, bounds: &DerivedBounds) -> RouterCall {
    match bounds.liquidity {
        Some(liquidity) => RouterCall::SwapThenAddLiquidity {
            token: intent.target_token(),
            swap_value: intent.input_value(),
            expected_token_out: bounds.quoted_output,
            token_min: liquidity.token_min,
            native_min: liquidity.native_min,
            liquidity_value: liquidity.native_value,
            deadline: bounds.deadline,
        },
        None => RouterCall::Swap {
            token: intent.target_token(),
            amount_out: bounds.min_output,
            amount_in_max: bounds.total_value_required,
            deadline: bounds.deadline,
        },
    }
}

// ============================================
// TESTS
// ============================================
