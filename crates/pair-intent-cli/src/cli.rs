//! CLI subcommand logic, output formatting, user interaction.

use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pair_intent::chain::{pool_listing, ChainClient, MemoryChain};
use pair_intent::config::{AppConfig, CliConfig};
use pair_intent::engine::quoting::{quote, reserve_curve};
use pair_intent::engine::{CommandDispatcher, Outcome, Plan};
use pair_intent::evaluation::{builtin_cases, run_suite};
use pair_intent::llm::{HttpLanguageModel, ModelChoice};
use pair_intent::{IntentPipeline, IntentValidator, TokenRegistry, U256};
use rust_decimal::Decimal;
use rustyline::error::ReadlineError;
use rustyline::history::MemHistory;
use rustyline::{Config, Editor};
use serde_json::Value;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Validate and plan natural-language pair commands",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub config: CliConfig,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Validate a JSON intent (inline, `@file` or `-` for stdin)
    Validate { intent: String },
    /// Plan a JSON intent against the reserve snapshot
    Plan {
        intent: String,
        /// Run the planned steps against the snapshot chain
        #[arg(long)]
        execute: bool,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive natural-language prompt
    Ask {
        #[arg(long, value_enum, default_value_t = ModelChoice::Primary)]
        model: ModelChoice,
        #[arg(long)]
        execute: bool,
    },
    /// Run the built-in prompt evaluation suite
    Eval {
        /// Models to score; defaults to the primary model
        #[arg(long, value_enum)]
        model: Vec<ModelChoice>,
    },
    /// Quote an exact-in swap from raw reserves
    Quote { amount_in: U256, reserve_in: U256, reserve_out: U256 },
    /// Sample the x*y=k curve through two human-unit reserves
    Curve { reserve0: Decimal, reserve1: Decimal },
    /// List the pairs known to the chain client
    Pools,
}

/// Handles CLI commands and output.
pub struct CliHandler {
    config: AppConfig,
    registry: Arc<TokenRegistry>,
    chain: Arc<MemoryChain>,
}

impl CliHandler {
    pub fn new(config: AppConfig) -> Result<Self> {
        let registry = config.registry()?;
        let chain = match config.snapshot_file.as_deref() {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading snapshot {path}"))?;
                MemoryChain::from_snapshot(&text, &registry, config.recipient)?
            }
            None => {
                warn!("no snapshot configured; every pair lookup will miss");
                MemoryChain::new()
            }
        };
        Ok(Self { config, registry: Arc::new(registry), chain: Arc::new(chain) })
    }

    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Validate { intent } => self.handle_validate(&intent),
            Commands::Plan { intent, execute, json } => {
                self.handle_plan(&intent, execute, json).await
            }
            Commands::Ask { model, execute } => self.handle_repl(model, execute).await,
            Commands::Eval { model } => self.handle_eval(model).await,
            Commands::Quote { amount_in, reserve_in, reserve_out } => {
                let out = quote(amount_in, reserve_in, reserve_out, self.config.fee_bps)?;
                println!("{out}");
                Ok(())
            }
            Commands::Curve { reserve0, reserve1 } => self.handle_curve(reserve0, reserve1),
            Commands::Pools => self.handle_pools().await,
        }
    }

    fn dispatcher(&self) -> CommandDispatcher<MemoryChain> {
        CommandDispatcher::from_config(self.chain.clone(), &self.config)
    }

    fn handle_validate(&self, intent: &str) -> Result<()> {
        let raw = read_intent(intent)?;
        match IntentValidator::new(&self.registry).validate(&raw) {
            Ok(command) => println!("ok: {command}"),
            Err(failure) => println!("rejected: {failure}"),
        }
        Ok(())
    }

    async fn handle_plan(&self, intent: &str, execute: bool, json: bool) -> Result<()> {
        let raw = read_intent(intent)?;
        let command = match IntentValidator::new(&self.registry).validate(&raw) {
            Ok(command) => command,
            Err(failure) => {
                println!("rejected: {failure}");
                return Ok(());
            }
        };
        let dispatcher = self.dispatcher();
        let plan = match dispatcher.plan(&command).await {
            Ok(plan) => plan,
            Err(e) => {
                println!("cannot plan: {e}");
                return Ok(());
            }
        };
        if json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            print_plan(&plan);
        }
        if execute {
            match dispatcher.execute(&plan).await {
                Ok(outcome) => {
                    println!("{outcome}");
                    if let Outcome::Deposited { pair, .. } = &outcome {
                        match dispatcher.mint_follow_up(pair) {
                            Ok(steps) => steps.iter().for_each(|s| println!("  next: {s}")),
                            Err(e) => println!("  cannot mint: {e}"),
                        }
                    }
                }
                Err(e) => println!("execution failed: {e}"),
            }
        }
        Ok(())
    }

    /// Interactive natural-language mode.
    async fn handle_repl(&self, model: ModelChoice, execute: bool) -> Result<()> {
        let pipeline = IntentPipeline::new(
            Arc::new(HttpLanguageModel::from_config(&self.config)),
            self.registry.clone(),
            self.dispatcher(),
        );
        let mut rl = Editor::<(), MemHistory>::with_history(Config::default(), MemHistory::new())?;
        println!(
            "Entering pair-intent REPL ({} model). Type 'help' for usage, 'exit' to quit.",
            model.as_str()
        );
        loop {
            let line = match rl.readline("> ") {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => {
                    println!("Error: {err:?}");
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let _ = rl.add_history_entry(line);
            match line {
                "exit" | "quit" => break,
                "help" => {
                    println!(
                        "Type a request such as 'swap 10 BTC for ETH' \
                         or 'what are the reserves of USDC/DOGE'."
                    );
                    continue;
                }
                _ => {}
            }

            if execute {
                match pipeline.run(line, model).await {
                    Ok(outcome) => println!("{outcome}"),
                    Err(e) => println!("rejected: {e}"),
                }
            } else {
                match pipeline.plan_prompt(line, model).await {
                    Ok(plan) => print_plan(&plan),
                    Err(e) => println!("rejected: {e}"),
                }
            }
        }
        Ok(())
    }

    async fn handle_eval(&self, models: Vec<ModelChoice>) -> Result<()> {
        let models = if models.is_empty() { vec![ModelChoice::Primary] } else { models };
        let pipeline = IntentPipeline::new(
            Arc::new(HttpLanguageModel::from_config(&self.config)),
            self.registry.clone(),
            self.dispatcher(),
        );
        let report = run_suite(&pipeline, &builtin_cases(), &models).await;
        println!("{report}");
        for model in models {
            let (passed, total) = report.score(model);
            println!("{}: {}/{}", model.as_str(), passed, total);
        }
        Ok(())
    }

    fn handle_curve(&self, reserve0: Decimal, reserve1: Decimal) -> Result<()> {
        let points = reserve_curve(reserve0, reserve1, &self.config.curve_spec());
        println!("x,y");
        for p in points {
            println!("{},{}", p.x, p.y);
        }
        Ok(())
    }

    async fn handle_pools(&self) -> Result<()> {
        let pairs = self.chain.all_pairs().await?;
        if pairs.is_empty() {
            println!("No pools.");
        }
        for listing in pool_listing(&self.registry, &pairs) {
            println!("{}  {}", listing.address, listing.name);
        }
        Ok(())
    }
}

fn print_plan(plan: &Plan) {
    println!("{} via pair {}", plan.command, plan.pair.address);
    for (i, step) in plan.steps.iter().enumerate() {
        println!("  {}. {}", i + 1, step);
    }
    println!("  effect: {:?}", plan.effect);
}

fn read_intent(arg: &str) -> Result<Value> {
    let text = if arg == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else if let Some(path) = arg.strip_prefix('@') {
        std::fs::read_to_string(path).with_context(|| format!("reading intent file {path}"))?
    } else {
        arg.to_string()
    };
    serde_json::from_str(&text).context("intent is not valid JSON")
}
