//! Router Guard
//!
//! Guarded execution of "swap, then optionally add liquidity" router calls:
//!
//! 1. Derive bounds from a live quote (minimum output, deadline, value)
//! 2. Dry-run the exact call; reject before spending anything
//! 3. Estimate gas and pad it by 50%
//! 4. Broadcast once, poll for inclusion within a budget
//! 5. Verify the balance change against the derived bounds
//! 6. Classify and report the outcome
//!
//! ```ignore
//! let config = PipelineConfig::from_env()?;
//! config.validate()?;
//! let chain = AlloyChain::from_config(&config, signer).await?;
//! let pipeline = Pipeline::new(Arc::new(chain), config);
//!
//! let intent = TradeIntent::swap(input, token, 500, 600);
//! match pipeline.execute(&intent).await? {
//!     Outcome::TimedOut { attempt } => pipeline.resume(attempt).await?,
//!     outcome => outcome,
//! };
//! ```

pub mod chain;
pub mod config;
pub mod error;
pub mod executor;
pub mod quantity;
pub mod simulator;
pub mod types;

pub use chain::{AlloyChain, CallSubmitter, ChainCapability, ChainReader, PollStatus};
pub use config::PipelineConfig;
pub use error::{ChainError, IntentError, PipelineError, PipelineResult};
pub use executor::{Outcome, OutcomeKind, PendingAttempt, Pipeline};
pub use types::{
    BalanceSnapshot, DerivedBounds, GasPlan, RouterCall, SimulationResult, SubmissionRecord,
    SubmissionStatus, TradeIntent, VerificationOutcome,
};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a stdout `tracing` subscriber, filtered by `RUST_LOG` and
/// defaulting to `router_guard=info`. A no-op if one is already installed.
pub fn init_tracing() -> eyre::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("router_guard=info"))?;

    // Embedding applications may already own the global subscriber
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .try_init();

    Ok(())
}
