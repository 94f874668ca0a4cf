//! Common types, enums, error handling, data models.

use std::fmt;

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Precision assumed when a token list entry does not specify one.
pub const DEFAULT_DECIMALS: u8 = 18;

/// A registered token: the ticker users type and the contract it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Token {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

impl Token {
    pub fn new(symbol: impl Into<String>, address: Address, decimals: u8) -> Self {
        Self { symbol: symbol.into(), address, decimals }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

/// An amount of one token in human units (`5 USDT`, not `5_000_000`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenAmount {
    pub token: Token,
    pub amount: Decimal,
}

/// Read-only analyses a `query` intent may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum QueryKind {
    Reserves,
    Swaps,
    Volume,
}

impl QueryKind {
    /// Parses the intent's `type` field. Matching ignores ASCII case.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "reserves" => Some(Self::Reserves),
            "swaps" => Some(Self::Swaps),
            "volume" => Some(Self::Volume),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reserves => "reserves",
            Self::Swaps => "swaps",
            Self::Volume => "volume",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated user intent. Every token inside has been resolved against the
/// registry; an intent with an unknown ticker never becomes a `Command`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Command {
    Swap { token_in: Token, token_out: Token, amount_in: Decimal },
    Deposit { amounts: [TokenAmount; 2] },
    Redeem { pool: (Token, Token) },
    Query { kind: QueryKind, pool: (Token, Token) },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Swap { .. } => CommandKind::Swap,
            Command::Deposit { .. } => CommandKind::Deposit,
            Command::Redeem { .. } => CommandKind::Redeem,
            Command::Query { kind, .. } => CommandKind::Query(*kind),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Swap { token_in, token_out, amount_in } => {
                write!(f, "swap {} {} -> {}", amount_in, token_in, token_out)
            }
            Command::Deposit { amounts: [a, b] } => {
                write!(f, "deposit {} {} + {} {}", a.amount, a.token, b.amount, b.token)
            }
            Command::Redeem { pool: (a, b) } => write!(f, "redeem liquidity from {}/{}", a, b),
            Command::Query { kind, pool: (a, b) } => write!(f, "query {} of {}/{}", kind, a, b),
        }
    }
}

/// Discriminant of [`Command`], used when only the shape of the answer matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CommandKind {
    Swap,
    Deposit,
    Redeem,
    Query(QueryKind),
}

/// Why an intent was rejected. Exactly one failure is reported per input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("malformed prompt")]
    MalformedInput,
    #[error("unknown token `{0}`")]
    UnknownToken(String),
    #[error("only 2-token pools are supported (got {0})")]
    UnsupportedTokenCount(usize),
    #[error("swaps into or out of more than one token are not supported")]
    MultiTokenSwapUnsupported,
    #[error("unsupported analysis `{0}`")]
    UnsupportedAnalysis(String),
    #[error("no pair found")]
    PairNotFound,
    #[error("unauthorized operation")]
    UnauthorizedOperation,
    #[error("batch queries are not implemented")]
    BatchQueryUnsupported,
}

/// A pair contract together with its canonical token ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PairHandle {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
}

impl PairHandle {
    /// Builds a handle, ordering the tokens the way the exchange does
    /// (ascending address bytes).
    pub fn new(address: Address, token_a: Address, token_b: Address) -> Self {
        let (token0, token1) =
            if token_a <= token_b { (token_a, token_b) } else { (token_b, token_a) };
        Self { address, token0, token1 }
    }

    /// True when `(a, b)` names the same two tokens as this pair, in any order.
    pub fn matches(&self, a: &Address, b: &Address) -> bool {
        (&self.token0 == a && &self.token1 == b) || (&self.token0 == b && &self.token1 == a)
    }
}

/// One planned on-chain action. Pure data until a chain client executes it.
///
/// `Swap`, `Mint` and `Burn` carry the pair contract they are sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CallStep {
    Approve { token: Address, spender: Address, amount: U256 },
    Transfer { token: Address, to: Address, amount: U256 },
    Swap { pair: Address, amount0_out: U256, amount1_out: U256, to: Address },
    Mint { pair: Address, to: Address },
    Burn { pair: Address, to: Address },
}

impl CallStep {
    pub fn name(&self) -> &'static str {
        match self {
            CallStep::Approve { .. } => "approve",
            CallStep::Transfer { .. } => "transfer",
            CallStep::Swap { .. } => "swap",
            CallStep::Mint { .. } => "mint",
            CallStep::Burn { .. } => "burn",
        }
    }
}

impl fmt::Display for CallStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallStep::Approve { token, spender, amount } => {
                write!(f, "approve({token}, spender={spender}, amount={amount})")
            }
            CallStep::Transfer { token, to, amount } => {
                write!(f, "transfer({token}, to={to}, amount={amount})")
            }
            CallStep::Swap { pair, amount0_out, amount1_out, to } => {
                write!(
                    f,
                    "swap({pair}, amount0Out={amount0_out}, amount1Out={amount1_out}, to={to})"
                )
            }
            CallStep::Mint { pair, to } => write!(f, "mint({pair}, to={to})"),
            CallStep::Burn { pair, to } => write!(f, "burn({pair}, to={to})"),
        }
    }
}

/// Raw `Swap` log of a pair contract.
///
/// A well-formed event has exactly one non-zero input side and exactly one
/// non-zero output side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SwapEvent {
    pub amount0_in: U256,
    pub amount1_in: U256,
    pub amount0_out: U256,
    pub amount1_out: U256,
}

impl SwapEvent {
    /// The amount paid into the pool, or `None` if the event is malformed.
    pub fn input(&self) -> Option<U256> {
        exactly_one(self.amount0_in, self.amount1_in)
    }

    /// The amount paid out of the pool, or `None` if the event is malformed.
    pub fn output(&self) -> Option<U256> {
        exactly_one(self.amount0_out, self.amount1_out)
    }

    pub fn is_well_formed(&self) -> bool {
        self.input().is_some() && self.output().is_some()
    }
}

fn exactly_one(a: U256, b: U256) -> Option<U256> {
    match (a.is_zero(), b.is_zero()) {
        (false, true) => Some(a),
        (true, false) => Some(b),
        _ => None,
    }
}

/// One chart point of a pair's swap history. Regenerated on every fetch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    pub index: usize,
    pub price: f64,
}

/// Token registry construction and lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("token `{0}` is not registered")]
    NotFound(String),
    #[error("duplicate symbol `{0}` in token table")]
    DuplicateSymbol(String),
    #[error("address {0} registered under two symbols")]
    DuplicateAddress(Address),
    #[error("token table contains an empty symbol")]
    EmptySymbol,
}

/// Failures of the integer amount path. Fatal to the current command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("pool reserves must be non-zero")]
    ZeroReserves,
    #[error("fee of {0} bps exceeds 10000")]
    InvalidFee(u32),
    #[error("arithmetic overflow computing {0}")]
    Overflow(&'static str),
    #[error("amount {0} is negative")]
    NegativeAmount(Decimal),
    #[error("amount {amount} has more fractional digits than the token's {decimals} decimals")]
    ExcessPrecision { amount: Decimal, decimals: u8 },
}

/// Errors reported by a chain client implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("reverted: {0}")]
    Reverted(String),
}

/// Errors produced while planning or executing a command.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("no pair found for {token_a}/{token_b}")]
    PairNotFound { token_a: String, token_b: String },
    #[error("no pool shares of pair {pair} to redeem")]
    InsufficientBalance { pair: Address },
    #[error("swap would return zero output")]
    InsufficientOutput,
    #[error("no recipient configured for {0:?}")]
    MissingRecipient(CommandKind),
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
    #[error("chain read failed: {0}")]
    ChainRead(#[source] ChainError),
    #[error("step {index} ({step}) failed: {reason}")]
    Execution {
        index: usize,
        step: CallStep,
        #[source]
        reason: ChainError,
    },
}

/// Errors from the language-model collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    #[error("missing or invalid prompt")]
    EmptyPrompt,
    #[error("invalid model setup: {0}")]
    InvalidSetup(String),
    #[error("model request failed: {0}")]
    Transport(String),
    #[error("unexpected model response: {0}")]
    BadResponse(String),
}

/// Umbrella error for the natural-language command path.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PairIntentError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    #[error(transparent)]
    Dispatch(DispatchError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("model produced no actionable command: {output}")]
    NoAction { output: String },
}

impl From<DispatchError> for PairIntentError {
    fn from(err: DispatchError) -> Self {
        match err {
            // A missing pair is reported to the user like any other rejected intent.
            DispatchError::PairNotFound { .. } => {
                PairIntentError::Validation(ValidationFailure::PairNotFound)
            }
            other => PairIntentError::Dispatch(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, PairIntentError>;
