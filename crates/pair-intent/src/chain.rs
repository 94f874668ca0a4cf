//! Chain client seam: pair lookup, reserve and balance reads, step execution
//! and `Swap` log queries.
//!
//! The core never talks to a node directly. Everything it needs from the chain
//! goes through [`ChainClient`]; retries, timeouts and log pagination are the
//! implementation's business. [`MemoryChain`] is an in-process implementation
//! backed by a reserve snapshot, used for dry runs and tests.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, RwLock};

use alloy_primitives::{keccak256, Address, B256, U256};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::registry::TokenRegistry;
use crate::types::{CallStep, ChainError, PairHandle, SwapEvent, DEFAULT_DECIMALS};
use crate::utils::units::to_raw_units;

/// Solidity signature of the pair contract's `Swap` event.
pub const SWAP_EVENT_SIGNATURE: &str = "Swap(address,uint256,uint256,uint256,uint256,address)";

/// `topic0` of [`SWAP_EVENT_SIGNATURE`].
pub fn swap_event_topic() -> B256 {
    keccak256(SWAP_EVENT_SIGNATURE.as_bytes())
}

/// A `Swap` log request, shaped by the dispatcher and served by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapLogQuery {
    pub pair: Address,
    pub topic0: B256,
    pub from_block: u64,
    /// `None` means up to the latest block.
    pub to_block: Option<u64>,
}

impl SwapLogQuery {
    pub fn new(pair: Address, from_block: u64, to_block: Option<u64>) -> Self {
        Self { pair, topic0: swap_event_topic(), from_block, to_block }
    }
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// The pair contract for two tokens, if the factory has one.
    async fn resolve_pair(
        &self,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<PairHandle>, ChainError>;

    /// `(reserve0, reserve1)` in the pair's canonical token order.
    async fn get_reserves(&self, pair: &PairHandle) -> Result<(U256, U256), ChainError>;

    /// Pool-share balance of `account`.
    async fn get_balance(&self, pair: &PairHandle, account: Address) -> Result<U256, ChainError>;

    async fn execute_call_step(&self, step: &CallStep) -> Result<(), ChainError>;

    /// Matching logs in the order the node returns them.
    async fn get_swap_events(&self, query: &SwapLogQuery) -> Result<Vec<SwapEvent>, ChainError>;

    /// Every pair the factory has created.
    async fn all_pairs(&self) -> Result<Vec<PairHandle>, ChainError>;
}

/// A pair as shown in the pool picker: `"BTC / ETH"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolListing {
    pub address: Address,
    pub name: String,
}

/// Names each pair by its tokens' symbols, falling back to the token address
/// for tokens the registry does not know.
pub fn pool_listing(registry: &TokenRegistry, pairs: &[PairHandle]) -> Vec<PoolListing> {
    let label = |token: &Address| {
        registry
            .symbol_of(token)
            .map(str::to_string)
            .unwrap_or_else(|| token.to_string())
    };
    pairs
        .iter()
        .map(|pair| PoolListing {
            address: pair.address,
            name: format!("{} / {}", label(&pair.token0), label(&pair.token1)),
        })
        .collect()
}

#[derive(Debug, Clone)]
struct MemoryPair {
    handle: PairHandle,
    reserve0: U256,
    reserve1: U256,
    /// `(block, event)` in insertion order.
    swaps: Vec<(u64, SwapEvent)>,
}

/// In-memory [`ChainClient`].
///
/// Executed steps are recorded, not applied: reserves and balances only change
/// through the setters. A single step index can be set to fail, to exercise
/// partial-execution reporting.
#[derive(Clone, Default)]
pub struct MemoryChain {
    pairs: Arc<RwLock<Vec<MemoryPair>>>,
    balances: Arc<RwLock<HashMap<(Address, Address), U256>>>,
    executed: Arc<Mutex<Vec<CallStep>>>,
    reject: Arc<Mutex<Option<(usize, String)>>>,
}

fn poisoned<T>(_: T) -> ChainError {
    ChainError::Transport("memory chain state poisoned".to_string())
}

impl MemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pair with reserves given per token; they are stored in
    /// canonical order.
    pub fn add_pair(
        &self,
        address: Address,
        token_a: Address,
        reserve_a: U256,
        token_b: Address,
        reserve_b: U256,
    ) -> PairHandle {
        let handle = PairHandle::new(address, token_a, token_b);
        let (reserve0, reserve1) =
            if handle.token0 == token_a { (reserve_a, reserve_b) } else { (reserve_b, reserve_a) };
        if let Ok(mut pairs) = self.pairs.write() {
            pairs.retain(|p| p.handle.address != address);
            pairs.push(MemoryPair { handle, reserve0, reserve1, swaps: Vec::new() });
        }
        handle
    }

    pub fn set_share_balance(&self, pair: Address, account: Address, amount: U256) {
        if let Ok(mut balances) = self.balances.write() {
            balances.insert((pair, account), amount);
        }
    }

    pub fn push_swap_event(&self, pair: Address, block: u64, event: SwapEvent) {
        if let Ok(mut pairs) = self.pairs.write() {
            if let Some(p) = pairs.iter_mut().find(|p| p.handle.address == pair) {
                p.swaps.push((block, event));
            }
        }
    }

    /// Makes the `index`-th executed step (0-based, counted over the chain's
    /// lifetime) fail with `reason`.
    pub fn reject_step(&self, index: usize, reason: impl Into<String>) {
        if let Ok(mut reject) = self.reject.lock() {
            *reject = Some((index, reason.into()));
        }
    }

    /// Steps executed successfully so far.
    pub fn executed_steps(&self) -> Vec<CallStep> {
        self.executed.lock().map(|steps| steps.clone()).unwrap_or_default()
    }

    /// Builds a chain from a TOML reserve snapshot.
    ///
    /// ```toml
    /// [[pairs]]
    /// address = "0x..."
    /// token_a = "BTC"
    /// token_b = "ETH"
    /// reserve_a = "100"      # human units
    /// reserve_b = "2000"
    /// shares = "10"          # pool shares held by `account`, human units
    ///
    /// [[pairs.swaps]]
    /// block = 12
    /// amount0_in = "1000"    # raw units
    /// amount1_out = "493"
    /// ```
    ///
    /// `shares` entries are dropped when no `account` is given.
    pub fn from_snapshot(
        text: &str,
        registry: &TokenRegistry,
        account: Option<Address>,
    ) -> anyhow::Result<Self> {
        let snapshot: Snapshot = toml::from_str(text).context("invalid reserve snapshot")?;
        let chain = Self::new();
        for entry in snapshot.pairs {
            let address = Address::from_str(entry.address.trim())
                .map_err(|e| anyhow!("invalid pair address {}: {}", entry.address, e))?;
            let token = |symbol: &str| {
                registry
                    .token(symbol)
                    .ok_or_else(|| anyhow!("snapshot pair {address} uses unknown token {symbol}"))
            };
            let token_a = token(entry.token_a.as_str())?;
            let token_b = token(entry.token_b.as_str())?;
            let reserve_a = human_to_raw(&entry.reserve_a, token_a.decimals)?;
            let reserve_b = human_to_raw(&entry.reserve_b, token_b.decimals)?;
            chain.add_pair(address, token_a.address, reserve_a, token_b.address, reserve_b);

            match (&entry.shares, account) {
                (Some(shares), Some(account)) => {
                    let shares = human_to_raw(shares, DEFAULT_DECIMALS)?;
                    chain.set_share_balance(address, account, shares);
                }
                (Some(_), None) => warn!(pair = %address, "no account to hold snapshot shares"),
                (None, _) => {}
            }
            for swap in entry.swaps {
                let event = SwapEvent {
                    amount0_in: raw(&swap.amount0_in)?,
                    amount1_in: raw(&swap.amount1_in)?,
                    amount0_out: raw(&swap.amount0_out)?,
                    amount1_out: raw(&swap.amount1_out)?,
                };
                chain.push_swap_event(address, swap.block, event);
            }
        }
        Ok(chain)
    }

    fn with_pair<T>(
        &self,
        address: Address,
        f: impl FnOnce(&MemoryPair) -> T,
    ) -> Result<T, ChainError> {
        let pairs = self.pairs.read().map_err(poisoned)?;
        pairs
            .iter()
            .find(|p| p.handle.address == address)
            .map(f)
            .ok_or_else(|| ChainError::Reverted(format!("no contract at {address}")))
    }
}

#[async_trait]
impl ChainClient for MemoryChain {
    async fn resolve_pair(
        &self,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<PairHandle>, ChainError> {
        let pairs = self.pairs.read().map_err(poisoned)?;
        Ok(pairs
            .iter()
            .map(|p| p.handle)
            .find(|h| h.matches(&token_a, &token_b)))
    }

    async fn get_reserves(&self, pair: &PairHandle) -> Result<(U256, U256), ChainError> {
        self.with_pair(pair.address, |p| (p.reserve0, p.reserve1))
    }

    async fn get_balance(&self, pair: &PairHandle, account: Address) -> Result<U256, ChainError> {
        let balances = self.balances.read().map_err(poisoned)?;
        Ok(balances.get(&(pair.address, account)).copied().unwrap_or(U256::ZERO))
    }

    async fn execute_call_step(&self, step: &CallStep) -> Result<(), ChainError> {
        let mut executed = self.executed.lock().map_err(poisoned)?;
        let reject = self.reject.lock().map_err(poisoned)?;
        if let Some((index, reason)) = reject.as_ref() {
            if *index == executed.len() {
                return Err(ChainError::Reverted(reason.clone()));
            }
        }
        executed.push(step.clone());
        Ok(())
    }

    async fn get_swap_events(&self, query: &SwapLogQuery) -> Result<Vec<SwapEvent>, ChainError> {
        self.with_pair(query.pair, |p| {
            p.swaps
                .iter()
                .filter(|(block, _)| {
                    *block >= query.from_block && query.to_block.map_or(true, |to| *block <= to)
                })
                .map(|(_, event)| *event)
                .collect()
        })
    }

    async fn all_pairs(&self) -> Result<Vec<PairHandle>, ChainError> {
        let pairs = self.pairs.read().map_err(poisoned)?;
        Ok(pairs.iter().map(|p| p.handle).collect())
    }
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    #[serde(default)]
    pairs: Vec<SnapshotPair>,
}

#[derive(Debug, Deserialize)]
struct SnapshotPair {
    address: String,
    token_a: String,
    token_b: String,
    reserve_a: String,
    reserve_b: String,
    shares: Option<String>,
    #[serde(default)]
    swaps: Vec<SnapshotSwap>,
}

#[derive(Debug, Deserialize)]
struct SnapshotSwap {
    #[serde(default)]
    block: u64,
    #[serde(default = "zero")]
    amount0_in: String,
    #[serde(default = "zero")]
    amount1_in: String,
    #[serde(default = "zero")]
    amount0_out: String,
    #[serde(default = "zero")]
    amount1_out: String,
}

fn zero() -> String {
    "0".to_string()
}

fn human_to_raw(value: &str, decimals: u8) -> anyhow::Result<U256> {
    let amount = Decimal::from_str(value.trim())
        .map_err(|e| anyhow!("invalid amount {}: {}", value, e))?;
    Ok(to_raw_units(amount, decimals)?)
}

fn raw(value: &str) -> anyhow::Result<U256> {
    U256::from_str(value.trim()).map_err(|e| anyhow!("invalid raw amount {}: {}", value, e))
}
