//! The Executor
//!
//! Runs one guarded attempt through its stages:
//! - Quantity derivation (bounds fixed for the whole attempt)
//! - Preflight simulation (terminal on rejection)
//! - Gas estimation with the fixed margin
//! - Submission and inclusion polling
//! - Post-condition verification
//! - Outcome classification
//!
//! ⚠️  Submission commits real funds. Everything before it is read-only.

mod outcome;
mod submitter;
mod verifier;

pub use outcome::{classify, Outcome, OutcomeKind, OutcomeLog, PendingAttempt};
pub use submitter::{PollPolicy, TransactionSubmitter};
pub use verifier::{signed_delta, PostConditionVerifier};

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::chain::ChainCapability;
use crate::config::PipelineConfig;
use crate::error::{ChainError, IntentError, PipelineError, PipelineResult};
use crate::quantity::{build_call, derive_bounds, validate_intent};
use crate::simulator::{GasEstimator, PreflightSimulator};
use crate::types::{SimulationResult, SubmissionStatus, TradeIntent};

fn ensure_live(cancel: &CancellationToken, stage: &'static str) -> PipelineResult<()> {
    if cancel.is_cancelled() {
        info!("Attempt cancelled before {}", stage);
        return Err(PipelineError::Cancelled { stage });
    }
    Ok(())
}

/// One pipeline instance per chain binding. Cheap to share across
/// concurrent attempts: it holds no per-attempt state.
pub struct Pipeline<C: ?Sized> {
    chain: Arc<C>,
    config: PipelineConfig,
    simulator: PreflightSimulator,
    estimator: GasEstimator,
    submitter: TransactionSubmitter,
}

impl<C> Pipeline<C>
where
    C: ChainCapability + ?Sized,
{
    pub fn new(chain: Arc<C>, config: PipelineConfig) -> Self {
        Self {
            simulator: PreflightSimulator::new(config.simulation_timeout()),
            estimator: GasEstimator::new(config.estimation_timeout()),
            submitter: TransactionSubmitter::new(config.poll_policy()),
            chain,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one attempt to a classified outcome.
    pub async fn execute(&self, intent: &TradeIntent) -> PipelineResult<Outcome> {
        self.execute_with_cancel(intent, &CancellationToken::new()).await
    }

    /// Like [`Pipeline::execute`], checking `cancel` between stages.
    ///
    /// Cancelling before broadcast ends with `PipelineError::Cancelled` and no
    /// chain effect. Cancelling afterwards only stops polling and yields a
    /// resumable `Outcome::TimedOut`.
    pub async fn execute_with_cancel(
        &self,
        intent: &TradeIntent,
        cancel: &CancellationToken,
    ) -> PipelineResult<Outcome> {
        let outcome = self.run(intent, cancel).await?;
        self.surface(intent, &outcome);
        Ok(outcome)
    }

    /// Run independent intents concurrently; results keep the input order.
    pub async fn execute_all(&self, intents: &[TradeIntent]) -> Vec<PipelineResult<Outcome>> {
        join_all(intents.iter().map(|intent| self.execute(intent))).await
    }

    /// Resume an inconclusive attempt by polling its request id again.
    ///
    /// A record that is already confirmed is not polled; only verification
    /// runs again.
    pub async fn resume(&self, attempt: PendingAttempt) -> PipelineResult<Outcome> {
        self.resume_with_cancel(attempt, &CancellationToken::new()).await
    }

    pub async fn resume_with_cancel(
        &self,
        mut attempt: PendingAttempt,
        cancel: &CancellationToken,
    ) -> PipelineResult<Outcome> {
        info!(
            "Resuming {} after {} polls",
            attempt.request_id(),
            attempt.record.poll_attempts
        );

        self.submitter
            .poll(&*self.chain, &mut attempt.record, cancel)
            .await;

        let intent = attempt.intent.clone();
        let outcome = self.settle(attempt).await?;
        self.surface(&intent, &outcome);
        Ok(outcome)
    }

    async fn run(&self, intent: &TradeIntent, cancel: &CancellationToken) -> PipelineResult<Outcome> {
        // Quantity Calculator
        validate_intent(intent)?;

        let quoted_output = self
            .bounded("quote", self.chain.quote(intent.input_value(), intent.target_token()))
            .await
            .map_err(|e| IntentError::InvalidIntent(format!("no live quote: {}", e)))?;
        let chain_time = self
            .bounded("block timestamp", self.chain.block_timestamp())
            .await?;

        let bounds = derive_bounds(intent, quoted_output, chain_time)?;
        let call = build_call(intent, &bounds);
        info!(
            "🎯 {} for {:?}: quote {}, min output {}, deadline {}, value {}",
            call.name(),
            intent.target_token(),
            bounds.quoted_output,
            bounds.min_output,
            bounds.deadline,
            bounds.total_value_required
        );

        // Preflight Simulator
        ensure_live(cancel, "simulation")?;
        if let SimulationResult::Rejected(reason) = self.simulator.run(&*self.chain, &call).await {
            return Ok(Outcome::RejectedBySimulation { reason });
        }

        // Gas Estimator
        ensure_live(cancel, "gas estimation")?;
        let gas = match self.estimator.estimate(&*self.chain, &call).await {
            Ok(plan) => plan,
            Err(failure) => {
                return Ok(Outcome::EstimationFailed {
                    reason: failure.to_string(),
                })
            }
        };

        let before = self
            .bounded(
                "balance snapshot",
                PostConditionVerifier::snapshot(&*self.chain, &call),
            )
            .await?;

        // Transaction Submitter
        ensure_live(cancel, "submission")?;
        let record = self
            .submitter
            .submit(&*self.chain, &call, &gas, cancel)
            .await
            .map_err(|e| PipelineError::Broadcast(e.to_string()))?;

        let attempt = PendingAttempt {
            intent: intent.clone(),
            call,
            bounds,
            before,
            record,
        };

        self.settle(attempt).await
    }

    /// Verify confirmed attempts, then classify.
    ///
    /// An unreadable after-snapshot leaves the attempt resumable instead of
    /// dropping it: the record stays `Confirmed` and `resume` verifies again.
    async fn settle(&self, attempt: PendingAttempt) -> PipelineResult<Outcome> {
        if attempt.record.status != SubmissionStatus::Confirmed {
            return Ok(classify(attempt, None));
        }

        let verification = self
            .bounded(
                "post-condition snapshot",
                PostConditionVerifier::verify(
                    &*self.chain,
                    &attempt.call,
                    &attempt.bounds,
                    &attempt.before,
                ),
            )
            .await;

        match verification {
            Ok(verification) => Ok(classify(attempt, Some(verification))),
            Err(e) => {
                error!(
                    "🚨 {} confirmed but post-conditions could not be read: {}. Resume to verify",
                    attempt.request_id(),
                    e
                );
                Ok(classify(attempt, None))
            }
        }
    }

    /// Bound a chain read by the configured read timeout.
    async fn bounded<T, F>(&self, what: &str, read: F) -> Result<T, ChainError>
    where
        F: Future<Output = Result<T, ChainError>>,
    {
        let limit = self.config.read_timeout();
        match tokio::time::timeout(limit, read).await {
            Ok(result) => result,
            Err(_) => Err(ChainError::Unavailable(format!(
                "{} timed out after {:?}",
                what, limit
            ))),
        }
    }

    fn surface(&self, intent: &TradeIntent, outcome: &Outcome) {
        outcome.report();

        if self.config.outcome_log {
            let entry = OutcomeLog::new(intent.target_token(), outcome);
            if let Err(e) = entry.append_to_file(&self.config.outcome_log_path) {
                warn!(
                    "Failed to journal outcome to {}: {}",
                    self.config.outcome_log_path, e
                );
            }
        }
    }
}

// ============================================
// TESTS
// ============================================
