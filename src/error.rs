//! Error taxonomy for the guarded execution pipeline.
//!
//! Terminal pipeline results (rejected, reverted, timed out, ...) are not
//! errors; they are [`crate::executor::Outcome`] values. The types here cover
//! the cases where nothing reached the chain. Once a call is broadcast every
//! result is an `Outcome`.

use thiserror::Error;

/// Problems with the trade intent itself. Never sent to chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentError {
    #[error("invalid intent: {0}")]
    InvalidIntent(String),

    #[error("arithmetic overflow while computing {0}")]
    ArithmeticOverflow(&'static str),
}

/// Failures reported by a chain capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(String),

    /// The node executed the call and it reverted.
    #[error("execution reverted: {reason}")]
    Reverted { reason: String },

    #[error("decode error: {0}")]
    Decode(String),

    /// Requested data does not exist on chain (missing block, no pair, ...)
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Errors that end a pipeline attempt without a classified outcome.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Intent(#[from] IntentError),

    #[error("chain read failed before submission: {0}")]
    Chain(#[from] ChainError),

    #[error("attempt cancelled before {stage}")]
    Cancelled { stage: &'static str },

    #[error("broadcast rejected by node: {0}")]
    Broadcast(String),
}

impl PipelineError {
    /// Whether restarting the whole pipeline with a fresh quote is a sane reaction.
    pub fn is_restartable(&self) -> bool {
        match self {
            PipelineError::Intent(IntentError::ArithmeticOverflow(_)) => false,
            PipelineError::Intent(IntentError::InvalidIntent(_)) => false,
            _ => true,
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
