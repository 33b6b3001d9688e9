//! Scripted in-memory chain for pipeline tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;

use super::{CallSubmitter, ChainReader, PollStatus};
use crate::error::ChainError;
use crate::types::{RequestId, RouterCall, SimulationResult};

pub(crate) const MOCK_NOW: u64 = 1_700_000_000;

pub(crate) fn ether(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
}

#[derive(Default)]
pub(crate) struct CallCounts {
    pub quote: AtomicUsize,
    pub simulate: AtomicUsize,
    pub estimate: AtomicUsize,
    pub send: AtomicUsize,
    pub poll: AtomicUsize,
    pub balance: AtomicUsize,
    pub position: AtomicUsize,
}

/// Each read pops the next scripted value; the last one repeats.
fn next_of<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    let mut queue = queue.lock().unwrap();
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

pub(crate) struct MockChain {
    pub timestamp: u64,
    pub quote: Result<U256, ChainError>,
    pub simulation: Result<SimulationResult, ChainError>,
    pub simulation_delay: Option<Duration>,
    pub estimate: Result<u64, ChainError>,
    pub estimate_delay: Option<Duration>,
    pub send_result: Result<RequestId, ChainError>,
    pub quote_delay: Option<Duration>,
    pub poll_delay: Option<Duration>,
    /// 1-based index of a `token_balance` read that fails with a transport error
    pub failing_balance_read: Option<usize>,
    polls: Mutex<VecDeque<Result<PollStatus, ChainError>>>,
    balances: Mutex<VecDeque<U256>>,
    positions: Mutex<VecDeque<U256>>,
    pub sent: Mutex<Vec<(RouterCall, u64)>>,
    pub calls: CallCounts,
}

impl MockChain {
    /// Happy path: 100 tokens quoted, 200k gas, confirmed on first poll,
    /// balance goes 0 -> 100 tokens.
    pub fn new() -> Self {
        Self {
            timestamp: MOCK_NOW,
            quote: Ok(ether(100)),
            simulation: Ok(SimulationResult::Accepted),
            simulation_delay: None,
            estimate: Ok(200_000),
            estimate_delay: None,
            send_result: Ok(B256::repeat_byte(0xab)),
            quote_delay: None,
            poll_delay: None,
            failing_balance_read: None,
            polls: Mutex::new(VecDeque::from([Ok(PollStatus::Confirmed {
                block_number: 100,
                gas_used: 150_000,
            })])),
            balances: Mutex::new(VecDeque::from([U256::ZERO, ether(100)])),
            positions: Mutex::new(VecDeque::from([U256::ZERO])),
            sent: Mutex::new(Vec::new()),
            calls: CallCounts::default(),
        }
    }

    pub fn with_polls(self, polls: Vec<Result<PollStatus, ChainError>>) -> Self {
        *self.polls.lock().unwrap() = polls.into();
        self
    }

    pub fn with_balances(self, balances: Vec<U256>) -> Self {
        *self.balances.lock().unwrap() = balances.into();
        self
    }

    pub fn with_positions(self, positions: Vec<U256>) -> Self {
        *self.positions.lock().unwrap() = positions.into();
        self
    }

    /// Replace the remaining poll script (e.g. the transaction lands later)
    pub fn set_polls(&self, polls: Vec<Result<PollStatus, ChainError>>) {
        *self.polls.lock().unwrap() = polls.into();
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn block_timestamp(&self) -> Result<u64, ChainError> {
        Ok(self.timestamp)
    }

    async fn token_balance(&self, _token: Address) -> Result<U256, ChainError> {
        let read = self.calls.balance.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_balance_read == Some(read) {
            return Err(ChainError::Transport("connection reset".into()));
        }
        next_of(&self.balances).ok_or_else(|| ChainError::Unavailable("no balance scripted".into()))
    }

    async fn liquidity_position(&self, _token: Address) -> Result<U256, ChainError> {
        self.calls.position.fetch_add(1, Ordering::SeqCst);
        next_of(&self.positions).ok_or_else(|| ChainError::Unavailable("no position scripted".into()))
    }

    async fn quote(&self, _input_value: U256, _token: Address) -> Result<U256, ChainError> {
        self.calls.quote.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.quote_delay {
            tokio::time::sleep(delay).await;
        }
        self.quote.clone()
    }
}

#[async_trait]
impl CallSubmitter for MockChain {
    async fn simulate(&self, _call: &RouterCall) -> Result<SimulationResult, ChainError> {
        self.calls.simulate.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.simulation_delay {
            tokio::time::sleep(delay).await;
        }
        self.simulation.clone()
    }

    async fn estimate_gas(&self, _call: &RouterCall) -> Result<u64, ChainError> {
        self.calls.estimate.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.estimate_delay {
            tokio::time::sleep(delay).await;
        }
        self.estimate.clone()
    }

    async fn send(&self, call: &RouterCall, gas_limit: u64) -> Result<RequestId, ChainError> {
        self.calls.send.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push((call.clone(), gas_limit));
        self.send_result.clone()
    }

    async fn poll_status(&self, _request_id: RequestId) -> Result<PollStatus, ChainError> {
        self.calls.poll.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.poll_delay {
            tokio::time::sleep(delay).await;
        }
        next_of(&self.polls).unwrap_or(Ok(PollStatus::Pending))
    }
}
