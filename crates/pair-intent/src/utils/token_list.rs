use std::str::FromStr;

use alloy_primitives::Address;
use anyhow::anyhow;
use serde::Deserialize;

use crate::registry::TokenRegistry;
use crate::types::{Token, DEFAULT_DECIMALS};

#[derive(Debug, Deserialize)]
struct TokenEntry {
    symbol: String,
    address: String,
    decimals: Option<u8>,
}

/// Load a token table from a JSON `[{"symbol": .., "address": "0x..", "decimals": ..}]`
/// array or a TOML file with `[[tokens]]` entries.
/// Accepts absolute or relative path.
pub fn load_token_list<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Vec<Token>> {
    let text = std::fs::read_to_string(&path)
        .map_err(|e| anyhow!("unable to read token list {}: {}", path.as_ref().display(), e))?;
    parse_token_list(&text)
        .map_err(|e| anyhow!("token list {}: {}", path.as_ref().display(), e))
}

/// Same as [`load_token_list`] for text already in memory.
pub fn parse_token_list(text: &str) -> anyhow::Result<Vec<Token>> {
    // 1. Try JSON array
    if let Ok(entries) = serde_json::from_str::<Vec<TokenEntry>>(text) {
        return to_tokens(entries);
    }

    // 2. Try TOML with wrapper
    #[derive(Deserialize)]
    struct Wrapper {
        tokens: Vec<TokenEntry>,
    }
    let wrapper: Wrapper =
        toml::from_str(text).map_err(|e| anyhow!("not valid JSON nor TOML: {}", e))?;
    to_tokens(wrapper.tokens)
}

/// Load a token list straight into a registry, rejecting duplicates.
pub fn load_registry<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<TokenRegistry> {
    let tokens = load_token_list(path)?;
    Ok(TokenRegistry::new(tokens)?)
}

fn to_tokens(entries: Vec<TokenEntry>) -> anyhow::Result<Vec<Token>> {
    entries
        .into_iter()
        .map(|e| {
            let address = Address::from_str(e.address.trim())
                .map_err(|err| anyhow!("invalid address {} for {}: {}", e.address, e.symbol, err))?;
            Ok(Token::new(e.symbol, address, e.decimals.unwrap_or(DEFAULT_DECIMALS)))
        })
        .collect()
}
