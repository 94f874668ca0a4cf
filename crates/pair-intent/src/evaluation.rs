//! Prompt evaluation: runs a fixed set of sentences through the pipeline and
//! checks each lands in the expected command or failure class.
//!
//! Cases are planned, never executed. Nothing is persisted between runs.

use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::chain::ChainClient;
use crate::llm::{LanguageModel, ModelChoice};
use crate::pipeline::IntentPipeline;
use crate::types::{CommandKind, DispatchError, PairIntentError, QueryKind, ValidationFailure};

/// Discriminant of [`ValidationFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    MalformedInput,
    UnknownToken,
    UnsupportedTokenCount,
    MultiTokenSwapUnsupported,
    UnsupportedAnalysis,
    PairNotFound,
    UnauthorizedOperation,
    BatchQueryUnsupported,
}

impl ValidationFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            ValidationFailure::MalformedInput => FailureKind::MalformedInput,
            ValidationFailure::UnknownToken(_) => FailureKind::UnknownToken,
            ValidationFailure::UnsupportedTokenCount(_) => FailureKind::UnsupportedTokenCount,
            ValidationFailure::MultiTokenSwapUnsupported => FailureKind::MultiTokenSwapUnsupported,
            ValidationFailure::UnsupportedAnalysis(_) => FailureKind::UnsupportedAnalysis,
            ValidationFailure::PairNotFound => FailureKind::PairNotFound,
            ValidationFailure::UnauthorizedOperation => FailureKind::UnauthorizedOperation,
            ValidationFailure::BatchQueryUnsupported => FailureKind::BatchQueryUnsupported,
        }
    }
}

/// What a case should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Expectation {
    Command(CommandKind),
    Failure(FailureKind),
    /// Any rejection passes; used where the right failure class is a judgement call.
    Rejected,
}

impl Expectation {
    pub fn is_met_by(&self, observed: &Observed) -> bool {
        match (self, observed) {
            (Expectation::Command(want), Observed::Command(got)) => want == got,
            (Expectation::Failure(want), Observed::Failure(got)) => want == got,
            (Expectation::Rejected, Observed::Failure(_)) => true,
            _ => false,
        }
    }
}

/// What a case actually produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Observed {
    Command(CommandKind),
    Failure(FailureKind),
    /// The run itself failed (model transport, chain read).
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvalCase {
    pub prompt: String,
    pub expected: Expectation,
}

impl EvalCase {
    pub fn new(prompt: impl Into<String>, expected: Expectation) -> Self {
        Self { prompt: prompt.into(), expected }
    }
}

/// The product's built-in evaluation prompts.
pub fn builtin_cases() -> Vec<EvalCase> {
    use Expectation::{Command as Cmd, Failure as Fail};
    let query = |kind| Cmd(CommandKind::Query(kind));
    vec![
        EvalCase::new("swap 10 BTC for ETH", Cmd(CommandKind::Swap)),
        EvalCase::new("deposit 5 USDT and 5 XRP", Cmd(CommandKind::Deposit)),
        EvalCase::new("redeem liquidity from BNB/SOL", Cmd(CommandKind::Redeem)),
        EvalCase::new("what are the reserves of USDC/DOGE", query(QueryKind::Reserves)),
        EvalCase::new("add liquidity using 20 BNB and 20 SOL", Cmd(CommandKind::Deposit)),
        EvalCase::new("remove all liquidity from USDC/DOGE", Cmd(CommandKind::Redeem)),
        EvalCase::new("what's the volume of ADA/TRX", query(QueryKind::Volume)),
        EvalCase::new("how many swaps happened in BTC/ETH", query(QueryKind::Swaps)),
        EvalCase::new("get price for 1 LINK in SUI", Cmd(CommandKind::Swap)),
        EvalCase::new(
            "swap 1000 ETH for BTC and USDT",
            Fail(FailureKind::MultiTokenSwapUnsupported),
        ),
        EvalCase::new(
            "simulate price impact for 100 USDT to XRP",
            Fail(FailureKind::UnsupportedAnalysis),
        ),
        EvalCase::new("redeem liquidity for non-existent pair", Fail(FailureKind::PairNotFound)),
        EvalCase::new("find best pool to swap BTC", Expectation::Rejected),
        EvalCase::new("add tokens BTC USDT C into pool", Fail(FailureKind::UnsupportedTokenCount)),
        EvalCase::new("deposit invalidtoken and BTC", Fail(FailureKind::UnknownToken)),
        EvalCase::new("swap from nothing to something", Fail(FailureKind::MalformedInput)),
        EvalCase::new("get reserves for all pools", Fail(FailureKind::BatchQueryUnsupported)),
        EvalCase::new("mint tokens to my wallet", Fail(FailureKind::UnauthorizedOperation)),
        EvalCase::new("graph prices of USDT/XRP", query(QueryKind::Swaps)),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseResult {
    pub prompt: String,
    pub model: ModelChoice,
    pub expected: Expectation,
    pub observed: Observed,
    pub passed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvalReport {
    pub results: Vec<CaseResult>,
}

impl EvalReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// `(passed, total)` for one model.
    pub fn score(&self, model: ModelChoice) -> (usize, usize) {
        self.results
            .iter()
            .filter(|r| r.model == model)
            .fold((0, 0), |(passed, total), r| (passed + usize::from(r.passed), total + 1))
    }
}

impl fmt::Display for EvalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in &self.results {
            let mark = if r.passed { "PASS" } else { "FAIL" };
            writeln!(
                f,
                "[{}] {:<9} {:<45} expected {:?}, got {:?}",
                mark,
                r.model.as_str(),
                r.prompt,
                r.expected,
                r.observed
            )?;
        }
        write!(f, "{}/{} passed", self.passed(), self.total())
    }
}

/// Scores how the pipeline classifies one sentence.
///
/// Only pair existence is checked against the chain. Other dispatch failures
/// (balance, amounts) depend on chain state rather than on how the prompt was
/// read, so the case scores as the command it produced.
pub async fn observe<M, C>(
    pipeline: &IntentPipeline<M, C>,
    prompt: &str,
    model: ModelChoice,
) -> Observed
where
    M: LanguageModel + ?Sized,
    C: ChainClient + ?Sized,
{
    let command = match pipeline.interpret(prompt, model).await {
        Ok(command) => command,
        Err(PairIntentError::Validation(failure)) => return Observed::Failure(failure.kind()),
        Err(PairIntentError::NoAction { .. }) => {
            return Observed::Failure(FailureKind::MalformedInput)
        }
        Err(other) => return Observed::Error(other.to_string()),
    };
    match pipeline.dispatcher().plan(&command).await {
        Ok(_) => Observed::Command(command.kind()),
        Err(DispatchError::PairNotFound { .. }) => Observed::Failure(FailureKind::PairNotFound),
        Err(DispatchError::ChainRead(e)) => Observed::Error(e.to_string()),
        Err(_) => Observed::Command(command.kind()),
    }
}

/// Runs every case against every model, one request at a time.
pub async fn run_suite<M, C>(
    pipeline: &IntentPipeline<M, C>,
    cases: &[EvalCase],
    models: &[ModelChoice],
) -> EvalReport
where
    M: LanguageModel + ?Sized,
    C: ChainClient + ?Sized,
{
    let mut report = EvalReport::default();
    for &model in models {
        for case in cases {
            let observed = observe(pipeline, &case.prompt, model).await;
            let passed = case.expected.is_met_by(&observed);
            report.results.push(CaseResult {
                prompt: case.prompt.clone(),
                model,
                expected: case.expected,
                observed,
                passed,
            });
        }
        let (passed, total) = report.score(model);
        info!(model = model.as_str(), passed, total, "evaluation finished");
    }
    report
}
