//! Token registry: the fixed ticker <-> address table every other component
//! resolves symbols through.
//!
//! The table is built once at start-up (either the built-in devnet table or
//! one loaded with [`crate::utils::token_list::load_token_list`]) and is never
//! mutated afterwards, so it can be shared behind an `Arc` without locking.

use std::collections::HashMap;

use alloy_primitives::{address, Address};
use indexmap::IndexMap;

use crate::types::{RegistryError, Token, DEFAULT_DECIMALS};

/// Tokens deployed on the local devnet the UI ships against.
const BUILTIN_TOKENS: [(&str, Address); 12] = [
    ("BTC", address!("5fbdb2315678afecb367f032d93f642f64180aa3")),
    ("ETH", address!("e7f1725e7734ce288f8367e1bb143e90bb3f0512")),
    ("USDT", address!("9fe46736679d2d9a65f0992f2272de9f3c7fa6e0")),
    ("XRP", address!("cf7ed3acca5a467e9e704c703e8d87f634fb0fc9")),
    ("BNB", address!("dc64a140aa3e981100a9beca4e685f962f0cf6c9")),
    ("SOL", address!("5fc8d32690cc91d4c39d9d3abcbd16989f875707")),
    ("USDC", address!("a513e6e4b8f2a923d98304ec87f64353c4d5c853")),
    ("DOGE", address!("2279b7a0a67db372996a5fab50d91eaa73d2ebe6")),
    ("ADA", address!("8a791620dd6260079bf849dc5567adc3f2fdc318")),
    ("TRX", address!("610178da211fef7d417bc0e6fed39f05609ad788")),
    ("LINK", address!("b7f8bc63bbcad18155201308c8f3540b07f84f5e")),
    ("SUI", address!("a51c1fc2f0d1a1b8494ed1fe312d7c3a78ed91c0")),
];

/// Immutable bidirectional symbol/address table.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    by_symbol: IndexMap<String, Token>,
    by_address: HashMap<Address, String>,
}

impl TokenRegistry {
    /// Builds a registry from an explicit token table.
    ///
    /// Symbols are case-sensitive keys; a repeated symbol or a repeated
    /// address is rejected rather than silently shadowed.
    pub fn new<I>(tokens: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = Token>,
    {
        let mut registry = Self::default();
        for token in tokens {
            if token.symbol.trim().is_empty() {
                return Err(RegistryError::EmptySymbol);
            }
            if registry.by_symbol.contains_key(&token.symbol) {
                return Err(RegistryError::DuplicateSymbol(token.symbol));
            }
            if registry.by_address.contains_key(&token.address) {
                return Err(RegistryError::DuplicateAddress(token.address));
            }
            registry.by_address.insert(token.address, token.symbol.clone());
            registry.by_symbol.insert(token.symbol.clone(), token);
        }
        Ok(registry)
    }

    /// The built-in devnet table.
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        for (symbol, address) in BUILTIN_TOKENS {
            registry.by_address.insert(address, symbol.to_string());
            registry
                .by_symbol
                .insert(symbol.to_string(), Token::new(symbol, address, DEFAULT_DECIMALS));
        }
        registry
    }

    /// Resolves a ticker to its contract address. Exact, case-sensitive match.
    pub fn resolve(&self, symbol: &str) -> Result<Address, RegistryError> {
        self.token(symbol)
            .map(|t| t.address)
            .ok_or_else(|| RegistryError::NotFound(symbol.to_string()))
    }

    pub fn token(&self, symbol: &str) -> Option<&Token> {
        self.by_symbol.get(symbol)
    }

    /// Reverse lookup, used when rendering pairs read from the chain.
    pub fn symbol_of(&self, address: &Address) -> Option<&str> {
        self.by_address.get(address).map(String::as_str)
    }

    pub fn token_by_address(&self, address: &Address) -> Option<&Token> {
        self.symbol_of(address).and_then(|s| self.by_symbol.get(s))
    }

    /// Tokens in table order.
    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.by_symbol.values()
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}
