//! Intent validation: the only boundary where model output becomes a typed
//! [`Command`].
//!
//! The input is whatever JSON the language model produced, so nothing about
//! its shape is trusted. Rules are checked in a fixed order and the first
//! violated rule decides the reported [`ValidationFailure`]:
//!
//! 1. not an object, or no usable `action` string: `MalformedInput`
//! 2. `swap`: more than one token on either side is `MultiTokenSwapUnsupported`,
//!    then missing tokens / non-positive `amount` is `MalformedInput`, then
//!    each symbol must resolve (`UnknownToken`)
//! 3. `deposit`: `amounts` must be a list of exactly two entries
//!    (`UnsupportedTokenCount`), each `{token, amount}`, then resolution
//! 4. `redeem`: a two-token `pool`, then resolution. Pair existence is a chain
//!    read and is checked by the dispatcher, not here
//! 5. `query`: `type` must be one of reserves/swaps/volume
//!    (`UnsupportedAnalysis`; a list of types is `BatchQueryUnsupported`), the
//!    request must name exactly one pool (`BatchQueryUnsupported`), then
//!    resolution
//! 6. any other action: `UnauthorizedOperation`
//!
//! Amounts are held as [`Decimal`]: at most 28 fractional digits and a 96-bit
//! mantissa. A positive amount outside that range (`1e40`, `1e-30`) cannot be
//! represented and is reported as `MalformedInput` like any other unusable
//! number.
//!
//! Validation is pure: apart from in-memory registry lookups it does no I/O.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::debug;

use crate::registry::TokenRegistry;
use crate::types::{Command, QueryKind, Token, TokenAmount, ValidationFailure};

/// Validates raw intents against a token registry.
#[derive(Debug, Clone, Copy)]
pub struct IntentValidator<'a> {
    registry: &'a TokenRegistry,
}

/// Shorthand for [`IntentValidator::validate`].
pub fn validate(raw: &Value, registry: &TokenRegistry) -> Result<Command, ValidationFailure> {
    IntentValidator::new(registry).validate(raw)
}

impl<'a> IntentValidator<'a> {
    pub fn new(registry: &'a TokenRegistry) -> Self {
        Self { registry }
    }

    pub fn validate(&self, raw: &Value) -> Result<Command, ValidationFailure> {
        let Some(intent) = raw.as_object() else {
            return Err(malformed("intent is not a JSON object"));
        };
        let action = match intent.get("action").and_then(Value::as_str) {
            Some(a) if !a.trim().is_empty() => a.trim().to_ascii_lowercase(),
            _ => return Err(malformed("missing `action`")),
        };

        match action.as_str() {
            "swap" => self.swap(intent),
            "deposit" => self.deposit(intent),
            "redeem" => self.redeem(intent),
            "query" => self.query(intent),
            other => {
                debug!(action = other, "rejecting action outside the supported set");
                Err(ValidationFailure::UnauthorizedOperation)
            }
        }
    }

    fn swap(&self, intent: &Map<String, Value>) -> Result<Command, ValidationFailure> {
        let sold = symbol_list(intent.get("tokenIn"), "tokenIn")?;
        let bought = symbol_list(intent.get("tokenOut"), "tokenOut")?;
        if sold.len() > 1 || bought.len() > 1 {
            return Err(ValidationFailure::MultiTokenSwapUnsupported);
        }
        let (Some(&sold), Some(&bought)) = (sold.first(), bought.first()) else {
            return Err(malformed("swap needs both `tokenIn` and `tokenOut`"));
        };
        let amount_in = positive_amount(intent.get("amount"))?;
        if sold == bought {
            return Err(malformed("swap into the same token"));
        }

        Ok(Command::Swap {
            token_in: self.resolve(sold)?,
            token_out: self.resolve(bought)?,
            amount_in,
        })
    }

    fn deposit(&self, intent: &Map<String, Value>) -> Result<Command, ValidationFailure> {
        let Some(entries) = intent.get("amounts").and_then(Value::as_array) else {
            return Err(malformed("deposit needs an `amounts` list"));
        };
        if entries.len() != 2 {
            return Err(ValidationFailure::UnsupportedTokenCount(entries.len()));
        }

        let mut parsed = Vec::with_capacity(2);
        for entry in entries {
            let Some(entry) = entry.as_object() else {
                return Err(malformed("deposit entry is not an object"));
            };
            let symbol = match entry.get("token").and_then(Value::as_str).map(str::trim) {
                Some(s) if !s.is_empty() => s,
                _ => return Err(malformed("deposit entry without `token`")),
            };
            parsed.push((symbol, positive_amount(entry.get("amount"))?));
        }
        if parsed[0].0 == parsed[1].0 {
            return Err(malformed("deposit names the same token twice"));
        }

        let first = TokenAmount { token: self.resolve(parsed[0].0)?, amount: parsed[0].1 };
        let second = TokenAmount { token: self.resolve(parsed[1].0)?, amount: parsed[1].1 };
        Ok(Command::Deposit { amounts: [first, second] })
    }

    fn redeem(&self, intent: &Map<String, Value>) -> Result<Command, ValidationFailure> {
        let symbols = match pool_shape(intent.get("pool"))? {
            PoolShape::Symbols(symbols) => symbols,
            PoolShape::Missing | PoolShape::Wildcard | PoolShape::Nested => {
                return Err(malformed("redeem needs a single `pool`"));
            }
        };
        Ok(Command::Redeem { pool: self.pool_pair(&symbols)? })
    }

    fn query(&self, intent: &Map<String, Value>) -> Result<Command, ValidationFailure> {
        let kind = match intent.get("type") {
            Some(Value::String(kind)) => match QueryKind::parse(kind) {
                Some(kind) => kind,
                None => return Err(ValidationFailure::UnsupportedAnalysis(kind.trim().to_string())),
            },
            Some(Value::Array(_)) => return Err(ValidationFailure::BatchQueryUnsupported),
            _ => return Err(malformed("query needs a `type`")),
        };

        if intent.contains_key("pools") {
            return Err(ValidationFailure::BatchQueryUnsupported);
        }
        let symbols = match pool_shape(intent.get("pool"))? {
            PoolShape::Symbols(symbols) if symbols.len() > 2 => {
                return Err(ValidationFailure::BatchQueryUnsupported);
            }
            PoolShape::Symbols(symbols) => symbols,
            PoolShape::Missing | PoolShape::Wildcard | PoolShape::Nested => {
                return Err(ValidationFailure::BatchQueryUnsupported);
            }
        };
        if symbols.len() < 2 {
            return Err(malformed("query pool needs two tokens"));
        }
        Ok(Command::Query { kind, pool: self.pool_pair(&symbols)? })
    }

    fn pool_pair(&self, symbols: &[&str]) -> Result<(Token, Token), ValidationFailure> {
        let [a, b] = symbols else {
            return Err(ValidationFailure::UnsupportedTokenCount(symbols.len()));
        };
        if a == b {
            return Err(malformed("pool names the same token twice"));
        }
        Ok((self.resolve(a)?, self.resolve(b)?))
    }

    fn resolve(&self, symbol: &str) -> Result<Token, ValidationFailure> {
        self.registry
            .token(symbol)
            .cloned()
            .ok_or_else(|| ValidationFailure::UnknownToken(symbol.to_string()))
    }
}

fn malformed(reason: &'static str) -> ValidationFailure {
    debug!(reason, "malformed intent");
    ValidationFailure::MalformedInput
}

/// A token field may be a single symbol or a list of symbols.
fn symbol_list<'v>(
    value: Option<&'v Value>,
    field: &'static str,
) -> Result<Vec<&'v str>, ValidationFailure> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => non_empty(s, field).map(|s| vec![s]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => non_empty(s, field),
                _ => Err(malformed("token list holds a non-string")),
            })
            .collect(),
        Some(_) => Err(malformed("token field has an unexpected type")),
    }
}

fn non_empty<'v>(s: &'v str, field: &'static str) -> Result<&'v str, ValidationFailure> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        debug!(field, "empty token symbol");
        return Err(ValidationFailure::MalformedInput);
    }
    Ok(trimmed)
}

/// Accepts a JSON number or a numeric string; the amount must be > 0 and fit
/// a [`Decimal`].
fn positive_amount(value: Option<&Value>) -> Result<Decimal, ValidationFailure> {
    let text = match value {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        _ => return Err(malformed("missing numeric `amount`")),
    };
    let amount = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| malformed("`amount` is not a number in decimal range"))?;
    if amount <= Decimal::ZERO {
        return Err(malformed("`amount` must be positive"));
    }
    Ok(amount)
}

enum PoolShape<'v> {
    Missing,
    /// `"all"` / `"*"`: every pool.
    Wildcard,
    /// A list of pools.
    Nested,
    Symbols(Vec<&'v str>),
}

/// Reads `pool` as `["A", "B"]` or `"A/B"`.
fn pool_shape(value: Option<&Value>) -> Result<PoolShape<'_>, ValidationFailure> {
    match value {
        None | Some(Value::Null) => Ok(PoolShape::Missing),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.eq_ignore_ascii_case("all") || s == "*" {
                return Ok(PoolShape::Wildcard);
            }
            s.split('/')
                .map(|part| non_empty(part, "pool"))
                .collect::<Result<Vec<_>, _>>()
                .map(PoolShape::Symbols)
        }
        Some(Value::Array(items)) if !items.is_empty() && items.iter().all(Value::is_array) => {
            Ok(PoolShape::Nested)
        }
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => non_empty(s, "pool"),
                _ => Err(malformed("pool holds a non-string")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(PoolShape::Symbols),
        Some(_) => Err(malformed("pool has an unexpected type")),
    }
}
