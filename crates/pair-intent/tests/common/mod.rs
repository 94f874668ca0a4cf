//! Chain double shared by the integration tests.

#![allow(dead_code)]

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use pair_intent::chain::{ChainClient, SwapLogQuery};
use pair_intent::types::{CallStep, ChainError, PairHandle, SwapEvent};

/// The chain reads a dispatcher can make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Read {
    ResolvePair,
    Reserves,
    Balance,
    SwapEvents,
}

/// Answers every lookup with one pair and fails the chosen read with a
/// transport error.
pub struct FlakyChain {
    pub pair: PairHandle,
    pub failing: Option<Read>,
}

impl FlakyChain {
    pub fn healthy(pair: PairHandle) -> Self {
        Self { pair, failing: None }
    }

    pub fn failing(pair: PairHandle, read: Read) -> Self {
        Self { pair, failing: Some(read) }
    }

    fn read(&self, read: Read) -> Result<(), ChainError> {
        match self.failing {
            Some(failing) if failing == read => {
                Err(ChainError::Transport(format!("{read:?} timed out")))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ChainClient for FlakyChain {
    async fn resolve_pair(
        &self,
        _token_a: Address,
        _token_b: Address,
    ) -> Result<Option<PairHandle>, ChainError> {
        self.read(Read::ResolvePair)?;
        Ok(Some(self.pair))
    }

    async fn get_reserves(&self, _pair: &PairHandle) -> Result<(U256, U256), ChainError> {
        self.read(Read::Reserves)?;
        Ok((U256::from(1_000_000u64), U256::from(1_000_000u64)))
    }

    async fn get_balance(&self, _pair: &PairHandle, _account: Address) -> Result<U256, ChainError> {
        self.read(Read::Balance)?;
        Ok(U256::from(10u64))
    }

    async fn execute_call_step(&self, _step: &CallStep) -> Result<(), ChainError> {
        Ok(())
    }

    async fn get_swap_events(&self, _query: &SwapLogQuery) -> Result<Vec<SwapEvent>, ChainError> {
        self.read(Read::SwapEvents)?;
        Ok(Vec::new())
    }

    async fn all_pairs(&self) -> Result<Vec<PairHandle>, ChainError> {
        Ok(vec![self.pair])
    }
}
