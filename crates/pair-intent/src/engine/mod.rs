pub mod analytics;
pub mod quoting;

use std::fmt;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chain::{ChainClient, SwapLogQuery};
use crate::config::AppConfig;
use crate::data_management::history::price_history;
use crate::types::{
    CallStep, ChainError, Command, CommandKind, DispatchError, PairHandle, PricePoint, QueryKind,
    Token,
};
use crate::utils::units::{from_raw_units, to_raw_units};
use analytics::{swap_count, volume, PairVolume};
use quoting::{quote, reserve_curve, CurvePoint, CurveSpec, DEFAULT_FEE_BPS};

/// What a deposit leaves for the user to do next.
///
/// Deposits only move funds into the pair; minting pool shares is a separate
/// command built with [`CommandDispatcher::mint_follow_up`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FollowUp {
    Mint { pair: Address },
}

/// Amounts decided while planning, before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PlannedEffect {
    Swap { token_in: Token, token_out: Token, amount_in: U256, amount_out: U256 },
    Deposit { follow_up: FollowUp },
    Redeem { shares: U256 },
    /// Reads only. `log_query` is set for the log-backed kinds.
    Query { kind: QueryKind, pool: (Token, Token), log_query: Option<SwapLogQuery> },
}

/// A command compiled against a reserve snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub command: Command,
    pub pair: PairHandle,
    /// Ordered; each step may depend on chain state left by the previous one.
    pub steps: Vec<CallStep>,
    pub effect: PlannedEffect,
}

/// Reserves of a pair, raw and in the user's token order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReserveReport {
    pub pair: PairHandle,
    pub reserve0: U256,
    pub reserve1: U256,
    /// The pool's tokens in the order the user named them.
    pub tokens: (Token, Token),
    /// Human-unit reserves matching `tokens`; `None` if too large to display.
    pub amounts: (Option<Decimal>, Option<Decimal>),
    pub curve: Vec<CurvePoint>,
}

/// Terminal state of a dispatched command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Outcome {
    Swapped {
        pair: PairHandle,
        token_in: Token,
        token_out: Token,
        amount_in: U256,
        amount_out: U256,
    },
    Deposited { pair: PairHandle, follow_up: FollowUp },
    Redeemed { pair: PairHandle, shares: U256 },
    Reserves(ReserveReport),
    SwapHistory { pair: PairHandle, count: usize, points: Vec<PricePoint> },
    Volume { pair: PairHandle, tokens: (Token, Token), volume: PairVolume },
}

/// Compiles commands into call steps and runs them through a [`ChainClient`].
///
/// Every invocation is independent: the only state read is what the chain
/// client returns during that call. Chain calls are awaited one at a time and
/// never retried.
pub struct CommandDispatcher<C: ?Sized> {
    chain: Arc<C>,
    /// Receives swap output and burn proceeds; its share balance is redeemed.
    /// Commands that pay out are refused while this is unset.
    recipient: Option<Address>,
    fee_bps: u32,
    from_block: u64,
    curve: CurveSpec,
}

impl<C: ChainClient + ?Sized> CommandDispatcher<C> {
    /// The zero address counts as no recipient.
    pub fn new(chain: Arc<C>, recipient: Option<Address>) -> Self {
        Self {
            chain,
            recipient: recipient.filter(|a| !a.is_zero()),
            fee_bps: DEFAULT_FEE_BPS,
            from_block: 0,
            curve: CurveSpec::default(),
        }
    }

    pub fn from_config(chain: Arc<C>, config: &AppConfig) -> Self {
        Self::new(chain, config.recipient)
            .with_fee_bps(config.fee_bps)
            .with_from_block(config.from_block)
            .with_curve(config.curve_spec())
    }

    pub fn with_fee_bps(mut self, fee_bps: u32) -> Self {
        self.fee_bps = fee_bps;
        self
    }

    pub fn with_from_block(mut self, from_block: u64) -> Self {
        self.from_block = from_block;
        self
    }

    pub fn with_curve(mut self, curve: CurveSpec) -> Self {
        self.curve = curve;
        self
    }

    /// Plans and executes `command`.
    pub async fn dispatch(&self, command: &Command) -> Result<Outcome, DispatchError> {
        let plan = self.plan(command).await?;
        self.execute(&plan).await
    }

    /// Reads what the command needs from the chain and computes its steps.
    /// Nothing is sent.
    pub async fn plan(&self, command: &Command) -> Result<Plan, DispatchError> {
        let plan = match command {
            Command::Swap { token_in, token_out, amount_in } => {
                let pair = self.pair_for(token_in, token_out).await?;
                let to = self.recipient_for(CommandKind::Swap)?;
                let (reserve0, reserve1) =
                    self.chain.get_reserves(&pair).await.map_err(DispatchError::ChainRead)?;
                let amount_in = to_raw_units(*amount_in, token_in.decimals)?;

                // Reserves and output slot follow the pair's canonical order.
                let sells_token0 = token_in.address == pair.token0;
                let (reserve_in, reserve_out) =
                    if sells_token0 { (reserve0, reserve1) } else { (reserve1, reserve0) };
                let amount_out = quote(amount_in, reserve_in, reserve_out, self.fee_bps)?;
                if amount_out.is_zero() {
                    return Err(DispatchError::InsufficientOutput);
                }
                let (amount0_out, amount1_out) =
                    if sells_token0 { (U256::ZERO, amount_out) } else { (amount_out, U256::ZERO) };

                Plan {
                    command: command.clone(),
                    pair,
                    steps: vec![
                        CallStep::Approve {
                            token: token_in.address,
                            spender: pair.address,
                            amount: amount_in,
                        },
                        CallStep::Transfer {
                            token: token_in.address,
                            to: pair.address,
                            amount: amount_in,
                        },
                        CallStep::Swap { pair: pair.address, amount0_out, amount1_out, to },
                    ],
                    effect: PlannedEffect::Swap {
                        token_in: token_in.clone(),
                        token_out: token_out.clone(),
                        amount_in,
                        amount_out,
                    },
                }
            }
            Command::Deposit { amounts: [first, second] } => {
                let pair = self.pair_for(&first.token, &second.token).await?;
                let mut steps = Vec::with_capacity(4);
                for entry in [first, second] {
                    let amount = to_raw_units(entry.amount, entry.token.decimals)?;
                    let token = entry.token.address;
                    steps.push(CallStep::Approve { token, spender: pair.address, amount });
                    steps.push(CallStep::Transfer { token, to: pair.address, amount });
                }
                Plan {
                    command: command.clone(),
                    pair,
                    steps,
                    effect: PlannedEffect::Deposit {
                        follow_up: FollowUp::Mint { pair: pair.address },
                    },
                }
            }
            Command::Redeem { pool: (a, b) } => {
                let pair = self.pair_for(a, b).await?;
                let owner = self.recipient_for(CommandKind::Redeem)?;
                let shares =
                    self.chain.get_balance(&pair, owner).await.map_err(DispatchError::ChainRead)?;
                if shares.is_zero() {
                    return Err(DispatchError::InsufficientBalance { pair: pair.address });
                }
                // The share token is the pair contract itself.
                Plan {
                    command: command.clone(),
                    pair,
                    steps: vec![
                        CallStep::Approve {
                            token: pair.address,
                            spender: pair.address,
                            amount: shares,
                        },
                        CallStep::Transfer {
                            token: pair.address,
                            to: pair.address,
                            amount: shares,
                        },
                        CallStep::Burn { pair: pair.address, to: owner },
                    ],
                    effect: PlannedEffect::Redeem { shares },
                }
            }
            Command::Query { kind, pool } => {
                let pair = self.pair_for(&pool.0, &pool.1).await?;
                let log_query = match kind {
                    QueryKind::Reserves => None,
                    QueryKind::Swaps | QueryKind::Volume => {
                        Some(SwapLogQuery::new(pair.address, self.from_block, None))
                    }
                };
                Plan {
                    command: command.clone(),
                    pair,
                    steps: Vec::new(),
                    effect: PlannedEffect::Query { kind: *kind, pool: pool.clone(), log_query },
                }
            }
        };

        for (index, step) in plan.steps.iter().enumerate() {
            debug!(index, %step, "planned step");
        }
        Ok(plan)
    }

    /// Sends the plan's steps in order and interprets the result.
    ///
    /// Stops at the first rejected step. Steps before it stay applied; the
    /// error names the failing step.
    pub async fn execute(&self, plan: &Plan) -> Result<Outcome, DispatchError> {
        for (index, step) in plan.steps.iter().enumerate() {
            if let Err(reason) = self.chain.execute_call_step(step).await {
                warn!(index, %step, %reason, "call step failed");
                return Err(DispatchError::Execution { index, step: step.clone(), reason });
            }
            info!(index, %step, "call step executed");
        }

        let pair = plan.pair;
        match &plan.effect {
            PlannedEffect::Swap { token_in, token_out, amount_in, amount_out } => {
                Ok(Outcome::Swapped {
                    pair,
                    token_in: token_in.clone(),
                    token_out: token_out.clone(),
                    amount_in: *amount_in,
                    amount_out: *amount_out,
                })
            }
            PlannedEffect::Deposit { follow_up } => {
                Ok(Outcome::Deposited { pair, follow_up: *follow_up })
            }
            PlannedEffect::Redeem { shares } => Ok(Outcome::Redeemed { pair, shares: *shares }),
            PlannedEffect::Query { kind, pool, log_query } => {
                self.run_query(*kind, pair, pool, log_query.as_ref()).await
            }
        }
    }

    /// Steps for the second phase of a deposit: mint shares to the recipient.
    pub fn mint_follow_up(&self, pair: &PairHandle) -> Result<Vec<CallStep>, DispatchError> {
        let to = self.recipient_for(CommandKind::Deposit)?;
        Ok(vec![CallStep::Mint { pair: pair.address, to }])
    }

    fn recipient_for(&self, kind: CommandKind) -> Result<Address, DispatchError> {
        self.recipient.ok_or_else(|| {
            warn!(?kind, "refusing to plan without a recipient");
            DispatchError::MissingRecipient(kind)
        })
    }

    async fn pair_for(&self, a: &Token, b: &Token) -> Result<PairHandle, DispatchError> {
        match self.chain.resolve_pair(a.address, b.address).await {
            Ok(Some(pair)) if pair.matches(&a.address, &b.address) => Ok(pair),
            Ok(Some(pair)) => Err(DispatchError::ChainRead(ChainError::Transport(format!(
                "pair {} does not hold {}/{}",
                pair.address, a.symbol, b.symbol
            )))),
            Ok(None) => {
                debug!(token_a = %a, token_b = %b, "no pair for tokens");
                Err(DispatchError::PairNotFound {
                    token_a: a.symbol.clone(),
                    token_b: b.symbol.clone(),
                })
            }
            Err(e) => Err(DispatchError::ChainRead(e)),
        }
    }

    async fn run_query(
        &self,
        kind: QueryKind,
        pair: PairHandle,
        pool: &(Token, Token),
        log_query: Option<&SwapLogQuery>,
    ) -> Result<Outcome, DispatchError> {
        let events = match log_query {
            Some(q) => self.chain.get_swap_events(q).await.map_err(DispatchError::ChainRead)?,
            None => Vec::new(),
        };

        match kind {
            QueryKind::Reserves => {
                let (reserve0, reserve1) =
                    self.chain.get_reserves(&pair).await.map_err(DispatchError::ChainRead)?;
                let (first, second) = pool;
                let (raw_first, raw_second) = if first.address == pair.token0 {
                    (reserve0, reserve1)
                } else {
                    (reserve1, reserve0)
                };
                let amounts = (
                    from_raw_units(raw_first, first.decimals),
                    from_raw_units(raw_second, second.decimals),
                );
                let curve = match amounts {
                    (Some(x), Some(y)) => reserve_curve(x, y, &self.curve),
                    _ => Vec::new(),
                };
                Ok(Outcome::Reserves(ReserveReport {
                    pair,
                    reserve0,
                    reserve1,
                    tokens: pool.clone(),
                    amounts,
                    curve,
                }))
            }
            QueryKind::Swaps => Ok(Outcome::SwapHistory {
                pair,
                count: swap_count(&events),
                points: price_history(&events),
            }),
            QueryKind::Volume => Ok(Outcome::Volume {
                pair,
                tokens: oriented(&pair, pool),
                volume: volume(&events)?,
            }),
        }
    }
}

/// The pool's tokens as `(token0, token1)`.
fn oriented(pair: &PairHandle, (a, b): &(Token, Token)) -> (Token, Token) {
    if a.address == pair.token0 {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

fn human(amount: U256, token: &Token) -> String {
    match from_raw_units(amount, token.decimals) {
        Some(value) => format!("{value} {token}"),
        None => format!("{amount} (raw) {token}"),
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Swapped { token_in, token_out, amount_in, amount_out, .. } => {
                let (sold, bought) = (human(*amount_in, token_in), human(*amount_out, token_out));
                write!(f, "swapped {sold} for {bought}")
            }
            Outcome::Deposited { pair, follow_up: FollowUp::Mint { .. } } => {
                write!(f, "deposited into pair {}; mint pool shares to finish", pair.address)
            }
            Outcome::Redeemed { pair, shares } => {
                write!(f, "redeemed {} shares of pair {}", shares, pair.address)
            }
            Outcome::Reserves(report) => {
                let (a, b) = &report.tokens;
                let show = |v: &Option<Decimal>| {
                    v.map(|d| d.to_string()).unwrap_or_else(|| "?".to_string())
                };
                write!(
                    f,
                    "reserves of {}/{}: {} {} / {} {} ({} curve points)",
                    a,
                    b,
                    show(&report.amounts.0),
                    a,
                    show(&report.amounts.1),
                    b,
                    report.curve.len()
                )
            }
            Outcome::SwapHistory { pair, count, points } => {
                write!(f, "{} swaps on pair {}", count, pair.address)?;
                if let Some(last) = points.last() {
                    write!(f, ", last price {:.6}", last.price)?;
                }
                Ok(())
            }
            Outcome::Volume { tokens: (t0, t1), volume, .. } => {
                write!(f, "volume: {} / {}", human(volume.token0, t0), human(volume.token1, t1))
            }
        }
    }
}
