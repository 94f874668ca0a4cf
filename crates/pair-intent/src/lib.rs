// Library entry point for pair-intent

pub mod chain;
pub mod config;
pub mod data_management;
pub mod engine;
pub mod evaluation;
pub mod intent;
pub mod llm;
pub mod pipeline;
pub mod registry;
pub mod types;
pub mod utils;

pub use chain::{ChainClient, MemoryChain};
pub use engine::{CommandDispatcher, Outcome, Plan};
pub use intent::IntentValidator;
pub use pipeline::IntentPipeline;
pub use registry::TokenRegistry;
pub use types::{Command, PairIntentError, ValidationFailure};

pub use alloy_primitives::{Address, U256};
