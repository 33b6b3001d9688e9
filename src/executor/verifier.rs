//! Post-condition Verifier
//!
//! Compares what actually moved against the bounds derived before
//! simulation. The "before" snapshot is always taken ahead of submission.

use alloy_primitives::{I256, U256};
use tracing::{debug, error};

use crate::chain::ChainReader;
use crate::error::ChainError;
use crate::types::{BalanceSnapshot, DerivedBounds, RouterCall, VerificationOutcome};

/// `after - before` as a signed value, saturating at the I256 range.
pub fn signed_delta(before: U256, after: U256) -> I256 {
    if after >= before {
        I256::try_from(after - before).unwrap_or(I256::MAX)
    } else {
        I256::try_from(before - after)
            .map(|d| -d)
            .unwrap_or(I256::MIN)
    }
}

pub struct PostConditionVerifier;

impl PostConditionVerifier {
    /// Read the balances the post-condition for `call` depends on.
    pub async fn snapshot<C>(chain: &C, call: &RouterCall) -> Result<BalanceSnapshot, ChainError>
    where
        C: ChainReader + ?Sized,
    {
        let token_balance = chain.token_balance(call.token()).await?;
        let position = if call.adds_liquidity() {
            Some(chain.liquidity_position(call.token()).await?)
        } else {
            None
        };

        debug!(
            "Snapshot for {:?}: balance {}, position {:?}",
            call.token(),
            token_balance,
            position
        );

        Ok(BalanceSnapshot {
            token_balance,
            position,
        })
    }

    /// Pure comparison of two snapshots against the attempt's bounds.
    ///
    /// Swap: the token delta must reach `min_output`.
    /// Swap then add liquidity: the position must grow; whatever token
    /// residual stays with the caller is dust.
    pub fn evaluate(
        bounds: &DerivedBounds,
        before: &BalanceSnapshot,
        after: &BalanceSnapshot,
    ) -> VerificationOutcome {
        let token_delta = signed_delta(before.token_balance, after.token_balance);

        match bounds.liquidity {
            Some(_) => {
                let position_before = before.position.unwrap_or_default();
                let position_after = after.position.unwrap_or_default();
                let observed_delta = signed_delta(position_before, position_after);

                VerificationOutcome {
                    expected: bounds.clone(),
                    observed_delta,
                    satisfied: position_after > position_before,
                    dust: Some(token_delta),
                }
            }
            None => {
                let received = after.token_balance.saturating_sub(before.token_balance);

                VerificationOutcome {
                    expected: bounds.clone(),
                    observed_delta: token_delta,
                    satisfied: after.token_balance >= before.token_balance
                        && received >= bounds.min_output,
                    dust: None,
                }
            }
        }
    }

    /// Take the "after" snapshot and evaluate it.
    pub async fn verify<C>(
        chain: &C,
        call: &RouterCall,
        bounds: &DerivedBounds,
        before: &BalanceSnapshot,
    ) -> Result<VerificationOutcome, ChainError>
    where
        C: ChainReader + ?Sized,
    {
        let after = Self::snapshot(chain, call).await?;
        let outcome = Self::evaluate(bounds, before, &after);

        if !outcome.satisfied {
            error!(
                "🚨 {} confirmed but post-condition unmet: observed delta {}, expected minimum {}. \
                 Local bounds disagree with the on-chain guard",
                call.name(),
                outcome.observed_delta,
                bounds.min_output
            );
        }

        Ok(outcome)
    }
}
