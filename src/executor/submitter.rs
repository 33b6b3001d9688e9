//! Transaction Submitter
//!
//! The only stage that commits value. It broadcasts exactly once per attempt
//! and then polls for inclusion within a bounded number of attempts and a
//! wall-clock budget. Resuming an attempt only polls again.

use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chain::{CallSubmitter, PollStatus};
use crate::error::ChainError;
use crate::types::{GasPlan, RouterCall, SubmissionRecord, SubmissionStatus};

/// Bounds on the inclusion-poll loop
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub budget: Duration,
}

pub struct TransactionSubmitter {
    policy: PollPolicy,
}

impl TransactionSubmitter {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    /// Sign and broadcast `call` with the planned gas limit, then poll.
    ///
    /// `Err` only when the node refused the broadcast; after that the
    /// returned record always carries a request id.
    pub async fn submit<C>(
        &self,
        chain: &C,
        call: &RouterCall,
        gas: &GasPlan,
        cancel: &CancellationToken,
    ) -> Result<SubmissionRecord, ChainError>
    where
        C: CallSubmitter + ?Sized,
    {
        let request_id = chain.send(call, gas.applied_limit).await?;
        info!(
            "📤 {} transaction sent: {} (gas limit {})",
            call.name(),
            request_id,
            gas.applied_limit
        );

        let mut record = SubmissionRecord {
            request_id,
            sent_at: Utc::now().timestamp().max(0) as u64,
            status: SubmissionStatus::Pending,
            gas_limit: gas.applied_limit,
            poll_attempts: 0,
            block_number: None,
            gas_used: None,
            revert_reason: None,
        };

        self.poll(chain, &mut record, cancel).await;
        Ok(record)
    }

    /// Poll `record.request_id` until it settles, the budget runs out, or
    /// `cancel` fires. Never re-sends.
    pub async fn poll<C>(&self, chain: &C, record: &mut SubmissionRecord, cancel: &CancellationToken)
    where
        C: CallSubmitter + ?Sized,
    {
        if record.status.is_final() {
            return;
        }
        record.status = SubmissionStatus::Pending;

        let started = Instant::now();
        let mut attempts = 0u32;

        while attempts < self.policy.max_attempts && started.elapsed() < self.policy.budget {
            attempts += 1;
            record.poll_attempts += 1;

            let remaining = self.policy.budget.saturating_sub(started.elapsed());
            match tokio::time::timeout(remaining, chain.poll_status(record.request_id)).await {
                Ok(Ok(PollStatus::Pending)) => {
                    debug!("{} pending (poll {})", record.request_id, attempts);
                }
                Ok(Ok(PollStatus::Confirmed {
                    block_number,
                    gas_used,
                })) => {
                    info!(
                        "✅ {} confirmed in block {} ({} gas)",
                        record.request_id, block_number, gas_used
                    );
                    record.status = SubmissionStatus::Confirmed;
                    record.block_number = Some(block_number);
                    record.gas_used = Some(gas_used);
                    return;
                }
                Ok(Ok(PollStatus::Reverted {
                    block_number,
                    reason,
                })) => {
                    warn!(
                        "❌ {} reverted in block {}: {}",
                        record.request_id,
                        block_number,
                        reason.as_deref().unwrap_or("no reason")
                    );
                    record.status = SubmissionStatus::Reverted;
                    record.block_number = Some(block_number);
                    record.revert_reason = reason;
                    return;
                }
                Ok(Err(e)) => {
                    // Node hiccups count against the budget but do not end the attempt
                    warn!("Poll {} for {} failed: {}", attempts, record.request_id, e);
                }
                Err(_) => {
                    debug!("Poll {} for {} ran out of budget", attempts, record.request_id);
                    break;
                }
            }

            if attempts >= self.policy.max_attempts {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Polling for {} stopped by caller", record.request_id);
                    record.status = SubmissionStatus::TimedOut;
                    return;
                }
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
        }

        warn!(
            "⏳ {} still pending after {} polls / {:?}",
            record.request_id,
            attempts,
            started.elapsed()
        );
        record.status = SubmissionStatus::TimedOut;
    }
}
