//! Token registry, token list and snapshot chain tests for pair-intent.

use std::str::FromStr;

use alloy_primitives::Address;
use pair_intent::chain::{pool_listing, ChainClient, MemoryChain, SwapLogQuery};
use pair_intent::types::{PairHandle, RegistryError, Token};
use pair_intent::utils::token_list::parse_token_list;
use pair_intent::{TokenRegistry, U256};

const BTC: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

#[test]
fn builtin_table_resolves_exact_symbols_only() {
    let registry = TokenRegistry::builtin();
    assert_eq!(registry.len(), 12);
    assert_eq!(registry.resolve("BTC").unwrap(), Address::from_str(BTC).unwrap());
    assert_eq!(registry.resolve("btc"), Err(RegistryError::NotFound("btc".to_string())));
    assert_eq!(registry.resolve(" BTC"), Err(RegistryError::NotFound(" BTC".to_string())));
}

#[test]
fn lookups_work_both_ways() {
    let registry = TokenRegistry::builtin();
    for token in registry.iter() {
        assert_eq!(registry.symbol_of(&token.address), Some(token.symbol.as_str()));
        assert_eq!(registry.token_by_address(&token.address), Some(token));
    }
    assert_eq!(registry.symbol_of(&Address::ZERO), None);
    let symbols: Vec<_> = registry.iter().take(3).map(|t| t.symbol.as_str()).collect();
    assert_eq!(symbols, ["BTC", "ETH", "USDT"]);
}

#[test]
fn duplicate_entries_are_rejected() {
    let a = Address::repeat_byte(1);
    let b = Address::repeat_byte(2);
    assert_eq!(
        TokenRegistry::new([Token::new("AAA", a, 18), Token::new("AAA", b, 18)]).unwrap_err(),
        RegistryError::DuplicateSymbol("AAA".to_string())
    );
    assert_eq!(
        TokenRegistry::new([Token::new("AAA", a, 18), Token::new("BBB", a, 18)]).unwrap_err(),
        RegistryError::DuplicateAddress(a)
    );
    assert_eq!(
        TokenRegistry::new([Token::new(" ", a, 18)]).unwrap_err(),
        RegistryError::EmptySymbol
    );
}

#[test]
fn token_lists_parse_from_json_or_toml() {
    let weth = format!("0x{}", "11".repeat(20));
    let json = format!(
        r#"[{{"symbol": "BTC", "address": "{BTC}", "decimals": 8}},
            {{"symbol": "WETH", "address": "{weth}"}}]"#
    );
    let tokens = parse_token_list(&json).unwrap();
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].decimals, 8);
    assert_eq!(tokens[1].decimals, 18);

    let toml = format!("[[tokens]]\nsymbol = \"BTC\"\naddress = \"{BTC}\"\ndecimals = 8\n");
    let tokens = parse_token_list(&toml).unwrap();
    assert_eq!(tokens, vec![Token::new("BTC", Address::from_str(BTC).unwrap(), 8)]);

    assert!(parse_token_list(r#"[{"symbol": "BAD", "address": "0x12"}]"#).is_err());
    assert!(parse_token_list("neither json nor toml [").is_err());
}

const SNAPSHOT: &str = r#"
[[pairs]]
address = "0x00000000000000000000000000000000000000aa"
token_a = "ETH"
token_b = "BTC"
reserve_a = "2000"
reserve_b = "100.5"
shares = "3"

[[pairs.swaps]]
block = 4
amount0_in = "1000"
amount1_out = "493"

[[pairs.swaps]]
block = 10
amount1_in = "500"
amount0_out = "990"

[[pairs]]
address = "0x00000000000000000000000000000000000000bb"
token_a = "USDT"
token_b = "XRP"
reserve_a = "1"
reserve_b = "1"
"#;

fn e18(v: u64) -> U256 {
    U256::from(v) * U256::from(10u64).pow(U256::from(18u64))
}

#[tokio::test]
async fn snapshot_builds_a_queryable_chain() {
    let registry = TokenRegistry::builtin();
    let account = Address::repeat_byte(0x42);
    let chain = MemoryChain::from_snapshot(SNAPSHOT, &registry, Some(account)).unwrap();

    let btc = registry.resolve("BTC").unwrap();
    let eth = registry.resolve("ETH").unwrap();
    let pair = chain.resolve_pair(eth, btc).await.unwrap().unwrap();
    assert_eq!(pair.token0, btc);
    assert_eq!(chain.resolve_pair(btc, eth).await.unwrap(), Some(pair));
    assert_eq!(
        chain.get_reserves(&pair).await.unwrap(),
        (e18(1005) / U256::from(10u64), e18(2000))
    );
    assert_eq!(chain.get_balance(&pair, account).await.unwrap(), e18(3));
    assert_eq!(chain.get_balance(&pair, Address::ZERO).await.unwrap(), U256::ZERO);

    let all = SwapLogQuery::new(pair.address, 0, None);
    assert_eq!(chain.get_swap_events(&all).await.unwrap().len(), 2);
    let window = SwapLogQuery::new(pair.address, 5, Some(10));
    assert_eq!(chain.get_swap_events(&window).await.unwrap().len(), 1);

    assert_eq!(chain.resolve_pair(btc, registry.resolve("SUI").unwrap()).await.unwrap(), None);
    assert_eq!(chain.all_pairs().await.unwrap().len(), 2);
}

#[test]
fn snapshot_with_unknown_token_fails() {
    let text = r#"
[[pairs]]
address = "0x00000000000000000000000000000000000000aa"
token_a = "BTC"
token_b = "NOPE"
reserve_a = "1"
reserve_b = "1"
"#;
    assert!(MemoryChain::from_snapshot(text, &TokenRegistry::builtin(), None).is_err());
}

#[tokio::test]
async fn snapshot_shares_need_an_owner() {
    let registry = TokenRegistry::builtin();
    let chain = MemoryChain::from_snapshot(SNAPSHOT, &registry, None).unwrap();
    let btc = registry.resolve("BTC").unwrap();
    let eth = registry.resolve("ETH").unwrap();
    let pair = chain.resolve_pair(btc, eth).await.unwrap().unwrap();
    assert_eq!(chain.get_balance(&pair, Address::ZERO).await.unwrap(), U256::ZERO);
    assert_eq!(chain.all_pairs().await.unwrap().len(), 2);
}

#[test]
fn pools_are_listed_by_symbol() {
    let registry = TokenRegistry::builtin();
    let btc = registry.resolve("BTC").unwrap();
    let eth = registry.resolve("ETH").unwrap();
    let stranger = Address::repeat_byte(0x01);
    let pairs = [
        PairHandle::new(Address::repeat_byte(0xAA), eth, btc),
        PairHandle::new(Address::repeat_byte(0xBB), btc, stranger),
    ];
    let names: Vec<_> = pool_listing(&registry, &pairs).into_iter().map(|l| l.name).collect();
    assert_eq!(names, vec!["BTC / ETH".to_string(), format!("{stranger} / BTC")]);
}
