//! Outcome Reporter
//!
//! Maps the terminal state of an attempt onto a small, fixed taxonomy and
//! surfaces it. Classification is pure; reporting only logs and optionally
//! journals.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use eyre::Result;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::types::{
    BalanceSnapshot, DerivedBounds, RequestId, RouterCall, SubmissionRecord, SubmissionStatus,
    TradeIntent, VerificationOutcome,
};

/// Everything needed to finish an attempt that was broadcast but not settled.
///
/// Resumption polls `record.request_id` again; the call is never re-sent and
/// the bounds are never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAttempt {
    pub intent: TradeIntent,
    pub call: RouterCall,
    pub bounds: DerivedBounds,
    pub before: BalanceSnapshot,
    pub record: SubmissionRecord,
}

impl PendingAttempt {
    pub fn request_id(&self) -> RequestId {
        self.record.request_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeKind {
    Success,
    RejectedBySimulation,
    EstimationFailed,
    RevertedOnChain,
    TimedOut,
    AnomalyUnmetInvariant,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::Success => write!(f, "SUCCESS"),
            OutcomeKind::RejectedBySimulation => write!(f, "REJECTED_BY_SIMULATION"),
            OutcomeKind::EstimationFailed => write!(f, "ESTIMATION_FAILED"),
            OutcomeKind::RevertedOnChain => write!(f, "REVERTED_ON_CHAIN"),
            OutcomeKind::TimedOut => write!(f, "TIMED_OUT"),
            OutcomeKind::AnomalyUnmetInvariant => write!(f, "ANOMALY_UNMET_INVARIANT"),
        }
    }
}

/// Terminal result of one pipeline attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        record: SubmissionRecord,
        verification: VerificationOutcome,
    },

    /// Nothing was estimated or sent
    RejectedBySimulation { reason: String },

    /// Nothing was sent; state drifted after simulation
    EstimationFailed { reason: String },

    /// Committed and failed on chain. Restart with a fresh quote.
    RevertedOnChain {
        record: SubmissionRecord,
        reason: Option<String>,
    },

    /// Inconclusive. Resume polling with the attempt, do not resubmit.
    TimedOut { attempt: PendingAttempt },

    /// Confirmed, yet the observed delta misses the local bounds
    AnomalyUnmetInvariant {
        record: SubmissionRecord,
        verification: VerificationOutcome,
    },
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Success { .. } => OutcomeKind::Success,
            Outcome::RejectedBySimulation { .. } => OutcomeKind::RejectedBySimulation,
            Outcome::EstimationFailed { .. } => OutcomeKind::EstimationFailed,
            Outcome::RevertedOnChain { .. } => OutcomeKind::RevertedOnChain,
            Outcome::TimedOut { .. } => OutcomeKind::TimedOut,
            Outcome::AnomalyUnmetInvariant { .. } => OutcomeKind::AnomalyUnmetInvariant,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Human-readable reason, when one exists
    pub fn reason(&self) -> Option<String> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::RejectedBySimulation { reason } | Outcome::EstimationFailed { reason } => {
                Some(reason.clone())
            }
            Outcome::RevertedOnChain { reason, .. } => reason.clone(),
            Outcome::TimedOut { attempt } if attempt.record.status == SubmissionStatus::Confirmed => {
                Some(format!(
                    "{} confirmed in block {} but post-conditions not yet verified",
                    attempt.request_id(),
                    attempt.record.block_number.unwrap_or_default()
                ))
            }
            Outcome::TimedOut { attempt } => Some(format!(
                "{} not included after {} polls",
                attempt.request_id(),
                attempt.record.poll_attempts
            )),
            Outcome::AnomalyUnmetInvariant { verification, .. } => {
                Some(match verification.expected.liquidity {
                    Some(_) => format!(
                        "liquidity position did not grow (delta {})",
                        verification.observed_delta
                    ),
                    None => format!(
                        "observed delta {} below expected minimum {}",
                        verification.observed_delta, verification.expected.min_output
                    ),
                })
            }
        }
    }

    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Outcome::Success { record, .. }
            | Outcome::RevertedOnChain { record, .. }
            | Outcome::AnomalyUnmetInvariant { record, .. } => Some(record.request_id),
            Outcome::TimedOut { attempt } => Some(attempt.request_id()),
            Outcome::RejectedBySimulation { .. } | Outcome::EstimationFailed { .. } => None,
        }
    }

    /// The resumption handle, for inconclusive outcomes
    pub fn pending(&self) -> Option<&PendingAttempt> {
        match self {
            Outcome::TimedOut { attempt } => Some(attempt),
            _ => None,
        }
    }

    /// Log the outcome at a level matching its kind
    pub fn report(&self) {
        match self {
            Outcome::Success { record, verification } => info!(
                "✅ SUCCESS {}: observed delta {} (minimum {})",
                record.request_id, verification.observed_delta, verification.expected.min_output
            ),
            Outcome::AnomalyUnmetInvariant { record, .. } => error!(
                "🚨 ANOMALY {}: {}. Investigate bound computation",
                record.request_id,
                self.reason().unwrap_or_default()
            ),
            _ => warn!("❌ {}", self),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.request_id(), self.reason()) {
            (Some(id), Some(reason)) => write!(f, "{} {}: {}", self.kind(), id, reason),
            (Some(id), None) => write!(f, "{} {}", self.kind(), id),
            (None, Some(reason)) => write!(f, "{}: {}", self.kind(), reason),
            (None, None) => write!(f, "{}", self.kind()),
        }
    }
}

/// Classify a broadcast attempt once polling has stopped.
///
/// `verification` is only consulted for confirmed records. A confirmed record
/// without one stays resumable: resuming skips polling and verifies.
pub fn classify(attempt: PendingAttempt, verification: Option<VerificationOutcome>) -> Outcome {
    match (attempt.record.status, verification) {
        (SubmissionStatus::Confirmed, Some(verification)) if verification.satisfied => Outcome::Success {
            record: attempt.record,
            verification,
        },
        (SubmissionStatus::Confirmed, Some(verification)) => Outcome::AnomalyUnmetInvariant {
            record: attempt.record,
            verification,
        },
        (SubmissionStatus::Reverted, _) => {
            let reason = attempt.record.revert_reason.clone();
            Outcome::RevertedOnChain {
                record: attempt.record,
                reason,
            }
        }
        (SubmissionStatus::Confirmed, None)
        | (SubmissionStatus::Pending, _)
        | (SubmissionStatus::TimedOut, _) => Outcome::TimedOut { attempt },
    }
}

// ============================================
// OUTCOME JOURNAL
// ============================================

/// One JSON line per terminal outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeLog {
    pub timestamp: DateTime<Utc>,
    pub kind: OutcomeKind,
    pub token: Address,
    pub request_id: Option<RequestId>,
    pub reason: Option<String>,
    pub min_output: Option<String>,
    pub observed_delta: Option<String>,
}

impl OutcomeLog {
    pub fn new(token: Address, outcome: &Outcome) -> Self {
        let (min_output, observed_delta) = match outcome {
            Outcome::Success { verification, .. }
            | Outcome::AnomalyUnmetInvariant { verification, .. } => (
                Some(verification.expected.min_output.to_string()),
                Some(verification.observed_delta.to_string()),
            ),
            Outcome::TimedOut { attempt } => (Some(attempt.bounds.min_output.to_string()), None),
            _ => (None, None),
        };

        Self {
            timestamp: Utc::now(),
            kind: outcome.kind(),
            token,
            request_id: outcome.request_id(),
            reason: outcome.reason(),
            min_output,
            observed_delta,
        }
    }

    /// Append this entry to a file
    pub fn append_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        let json = serde_json::to_string(self)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LiquidityBounds;
    use alloy_primitives::{B256, I256, U256};

    fn attempt(status: SubmissionStatus) -> PendingAttempt {
        let bounds = DerivedBounds {
            quoted_output: U256::from(100u64),
            min_output: U256::from(95u64),
            deadline: 1_700_000_600,
            total_value_required: U256::from(1u64),
            liquidity: None,
        };
        PendingAttempt {
            intent: TradeIntent::swap(U256::from(1u64), Address::repeat_byte(0x11), 500, 600),
            call: RouterCall::Swap {
                token: Address::repeat_byte(0x11),
                amount_out: bounds.min_output,
                amount_in_max: U256::from(1u64),
                deadline: bounds.deadline,
            },
            bounds,
            before: BalanceSnapshot {
                token_balance: U256::ZERO,
                position: None,
            },
            record: SubmissionRecord {
                request_id: B256::repeat_byte(0xab),
                sent_at: 1_700_000_001,
                status,
                gas_limit: 300_000,
                poll_attempts: 2,
                block_number: None,
                gas_used: None,
                revert_reason: Some("K".into()).filter(|_| status == SubmissionStatus::Reverted),
            },
        }
    }

    fn verification(satisfied: bool, delta: i64) -> VerificationOutcome {
        VerificationOutcome {
            expected: attempt(SubmissionStatus::Confirmed).bounds,
            observed_delta: I256::try_from(delta).unwrap(),
            satisfied,
            dust: None,
        }
    }

    #[test]
    fn test_confirmed_and_satisfied_is_success() {
        let outcome = classify(attempt(SubmissionStatus::Confirmed), Some(verification(true, 100)));
        assert_eq!(outcome.kind(), OutcomeKind::Success);
        assert!(outcome.is_success());
        assert!(outcome.reason().is_none());
    }

    #[test]
    fn test_confirmed_but_unmet_is_anomaly() {
        let outcome = classify(attempt(SubmissionStatus::Confirmed), Some(verification(false, 90)));
        assert_eq!(outcome.kind(), OutcomeKind::AnomalyUnmetInvariant);
        assert!(outcome.reason().unwrap().contains("below expected minimum 95"));
    }

    #[test]
    fn test_liquidity_anomaly_names_the_position() {
        let mut verification = verification(false, 0);
        verification.expected.liquidity = Some(LiquidityBounds {
            token_min: U256::from(95u64),
            native_min: U256::from(1u64),
            native_value: U256::from(2u64),
        });

        let outcome = classify(attempt(SubmissionStatus::Confirmed), Some(verification));

        let reason = outcome.reason().unwrap();
        assert_eq!(outcome.kind(), OutcomeKind::AnomalyUnmetInvariant);
        assert!(reason.contains("liquidity position did not grow"));
        assert!(!reason.contains("expected minimum"));
    }

    #[test]
    fn test_reverted_keeps_reason() {
        let outcome = classify(attempt(SubmissionStatus::Reverted), None);
        assert_eq!(outcome.kind(), OutcomeKind::RevertedOnChain);
        assert_eq!(outcome.reason().as_deref(), Some("K"));
    }

    #[test]
    fn test_timed_out_is_resumable() {
        let outcome = classify(attempt(SubmissionStatus::TimedOut), None);
        assert_eq!(outcome.kind(), OutcomeKind::TimedOut);
        assert_eq!(outcome.pending().unwrap().request_id(), B256::repeat_byte(0xab));

        // Confirmed but never verified stays resumable too
        let outcome = classify(attempt(SubmissionStatus::Confirmed), None);
        assert_eq!(outcome.kind(), OutcomeKind::TimedOut);
        assert!(outcome.reason().unwrap().contains("not yet verified"));
    }

    #[test]
    fn test_display_carries_kind_and_reason() {
        let outcome = Outcome::RejectedBySimulation {
            reason: "INSUFFICIENT_OUTPUT_AMOUNT".into(),
        };
        assert_eq!(outcome.to_string(), "REJECTED_BY_SIMULATION: INSUFFICIENT_OUTPUT_AMOUNT");
    }

    #[test]
    fn test_journal_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("outcomes.log");
        let token = Address::repeat_byte(0x11);

        let success = classify(attempt(SubmissionStatus::Confirmed), Some(verification(true, 100)));
        OutcomeLog::new(token, &success).append_to_file(&path).unwrap();
        let rejected = Outcome::EstimationFailed {
            reason: "estimation reverted: EXPIRED".into(),
        };
        OutcomeLog::new(token, &rejected).append_to_file(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<OutcomeLog> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].kind, OutcomeKind::Success);
        assert_eq!(lines[0].observed_delta.as_deref(), Some("100"));
        assert_eq!(lines[1].kind, OutcomeKind::EstimationFailed);
        assert!(lines[1].request_id.is_none());
    }
}
