//! Configuration loading, env vars, CLI flags.
//!
//! Precedence: CLI flags > TOML config file > environment > defaults.

use std::env;
use std::str::FromStr;

use alloy_primitives::{address, Address};
use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use tracing::info;

use crate::engine::quoting::{
    CurveSpec, DEFAULT_CURVE_CEILING, DEFAULT_CURVE_DOMAIN, DEFAULT_FEE_BPS,
};
use crate::registry::TokenRegistry;
use crate::utils::token_list::load_registry;

#[cfg(feature = "cli")]
use clap::Args;

/// Factory of the deployment the pool picker enumerates.
pub const DEFAULT_FACTORY_ADDRESS: Address = address!("0165878A594ca255338adfa4d48449f69242Eb8F");
pub const DEFAULT_PRIMARY_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_PRIMARY_MODEL: &str = "gpt-4o";
pub const DEFAULT_SECONDARY_MODEL: &str = "mistral";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub factory_address: Address,
    /// Receives swap output and burn proceeds. Its share balance is what a
    /// redeem burns. Swaps, redeems and mints are refused while unset.
    pub recipient: Option<Address>,
    pub fee_bps: u32,
    pub tokens_file: Option<String>,
    pub snapshot_file: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_primary_url: String,
    pub llm_primary_model: String,
    pub llm_secondary_endpoint: Option<String>,
    pub llm_secondary_model: String,
    /// First block scanned for `Swap` logs.
    pub from_block: u64,
    pub curve_start: u64,
    pub curve_end: u64,
    pub curve_ceiling: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            factory_address: DEFAULT_FACTORY_ADDRESS,
            recipient: None,
            fee_bps: DEFAULT_FEE_BPS,
            tokens_file: None,
            snapshot_file: None,
            llm_api_key: None,
            llm_primary_url: DEFAULT_PRIMARY_URL.to_string(),
            llm_primary_model: DEFAULT_PRIMARY_MODEL.to_string(),
            llm_secondary_endpoint: None,
            llm_secondary_model: DEFAULT_SECONDARY_MODEL.to_string(),
            from_block: 0,
            curve_start: *DEFAULT_CURVE_DOMAIN.start(),
            curve_end: *DEFAULT_CURVE_DOMAIN.end(),
            curve_ceiling: DEFAULT_CURVE_CEILING,
        }
    }
}

/// One configuration layer. Every field is optional; unset fields fall
/// through to the next layer.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileConfig {
    pub factory_address: Option<String>,
    pub recipient: Option<String>,
    pub fee_bps: Option<u32>,
    pub tokens_file: Option<String>,
    pub snapshot_file: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_primary_url: Option<String>,
    pub llm_primary_model: Option<String>,
    pub llm_secondary_endpoint: Option<String>,
    pub llm_secondary_model: Option<String>,
    pub from_block: Option<u64>,
    pub curve_start: Option<u64>,
    pub curve_end: Option<u64>,
    pub curve_ceiling: Option<f64>,
}

impl FileConfig {
    pub fn from_path(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {path}"))?;
        toml::from_str(&contents).with_context(|| format!("parsing config file {path}"))
    }

    pub fn from_env() -> Self {
        Self {
            factory_address: env::var("FACTORY_ADDRESS").ok(),
            recipient: env::var("RECIPIENT").ok(),
            fee_bps: env::var("FEE_BPS").ok().and_then(|s| s.parse().ok()),
            tokens_file: env::var("TOKENS_FILE").ok(),
            snapshot_file: env::var("SNAPSHOT_FILE").ok(),
            llm_api_key: env::var("OPENAI_API_KEY").ok(),
            llm_primary_url: env::var("LLM_PRIMARY_URL").ok(),
            llm_primary_model: env::var("LLM_PRIMARY_MODEL").ok(),
            llm_secondary_endpoint: env::var("OSS_URL").ok(),
            llm_secondary_model: env::var("LLM_SECONDARY_MODEL").ok(),
            from_block: env::var("FROM_BLOCK").ok().and_then(|s| s.parse().ok()),
            curve_start: None,
            curve_end: None,
            curve_ceiling: env::var("CURVE_CEILING").ok().and_then(|s| s.parse().ok()),
        }
    }

    /// Fields set in `self` win over `lower`.
    pub fn or(self, lower: FileConfig) -> Self {
        Self {
            factory_address: self.factory_address.or(lower.factory_address),
            recipient: self.recipient.or(lower.recipient),
            fee_bps: self.fee_bps.or(lower.fee_bps),
            tokens_file: self.tokens_file.or(lower.tokens_file),
            snapshot_file: self.snapshot_file.or(lower.snapshot_file),
            llm_api_key: self.llm_api_key.or(lower.llm_api_key),
            llm_primary_url: self.llm_primary_url.or(lower.llm_primary_url),
            llm_primary_model: self.llm_primary_model.or(lower.llm_primary_model),
            llm_secondary_endpoint: self.llm_secondary_endpoint.or(lower.llm_secondary_endpoint),
            llm_secondary_model: self.llm_secondary_model.or(lower.llm_secondary_model),
            from_block: self.from_block.or(lower.from_block),
            curve_start: self.curve_start.or(lower.curve_start),
            curve_end: self.curve_end.or(lower.curve_end),
            curve_ceiling: self.curve_ceiling.or(lower.curve_ceiling),
        }
    }
}

#[cfg(feature = "cli")]
#[derive(Args, Debug, Default, Clone)]
pub struct CliConfig {
    /// TOML config file
    #[arg(long, global = true)]
    pub config: Option<String>,
    #[arg(long, global = true)]
    pub factory_address: Option<String>,
    /// Account receiving swap output and burn proceeds
    #[arg(long, global = true)]
    pub recipient: Option<String>,
    #[arg(long, global = true)]
    pub fee_bps: Option<u32>,
    /// Token table (JSON array or TOML `[[tokens]]`)
    #[arg(long, global = true)]
    pub tokens_file: Option<String>,
    /// Reserve snapshot used for dry runs
    #[arg(long, global = true)]
    pub snapshot_file: Option<String>,
    #[arg(long, global = true)]
    pub llm_api_key: Option<String>,
    #[arg(long, global = true)]
    pub llm_primary_url: Option<String>,
    #[arg(long, global = true)]
    pub llm_primary_model: Option<String>,
    /// Endpoint of the self-hosted model
    #[arg(long = "oss-url", global = true)]
    pub llm_secondary_endpoint: Option<String>,
    #[arg(long, global = true)]
    pub llm_secondary_model: Option<String>,
    #[arg(long, global = true)]
    pub from_block: Option<u64>,
    #[arg(long, global = true)]
    pub curve_start: Option<u64>,
    #[arg(long, global = true)]
    pub curve_end: Option<u64>,
    #[arg(long, global = true)]
    pub curve_ceiling: Option<f64>,
}

#[cfg(feature = "cli")]
impl From<&CliConfig> for FileConfig {
    fn from(cli: &CliConfig) -> Self {
        Self {
            factory_address: cli.factory_address.clone(),
            recipient: cli.recipient.clone(),
            fee_bps: cli.fee_bps,
            tokens_file: cli.tokens_file.clone(),
            snapshot_file: cli.snapshot_file.clone(),
            llm_api_key: cli.llm_api_key.clone(),
            llm_primary_url: cli.llm_primary_url.clone(),
            llm_primary_model: cli.llm_primary_model.clone(),
            llm_secondary_endpoint: cli.llm_secondary_endpoint.clone(),
            llm_secondary_model: cli.llm_secondary_model.clone(),
            from_block: cli.from_block,
            curve_start: cli.curve_start,
            curve_end: cli.curve_end,
            curve_ceiling: cli.curve_ceiling,
        }
    }
}

impl AppConfig {
    /// CLI flags over the `--config` file over the environment over defaults.
    #[cfg(feature = "cli")]
    pub fn from_cli(cli: &CliConfig) -> anyhow::Result<Self> {
        let file = match cli.config.as_deref() {
            Some(path) => FileConfig::from_path(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(FileConfig::from(cli).or(file).or(FileConfig::from_env()))
    }

    /// Fills unset fields with defaults and checks the result.
    pub fn resolve(layer: FileConfig) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            factory_address: parse_address(layer.factory_address.as_deref(), "factory_address")?
                .unwrap_or(defaults.factory_address),
            recipient: parse_address(layer.recipient.as_deref(), "recipient")?,
            fee_bps: layer.fee_bps.unwrap_or(defaults.fee_bps),
            tokens_file: layer.tokens_file,
            snapshot_file: layer.snapshot_file,
            llm_api_key: layer.llm_api_key,
            llm_primary_url: layer.llm_primary_url.unwrap_or(defaults.llm_primary_url),
            llm_primary_model: layer.llm_primary_model.unwrap_or(defaults.llm_primary_model),
            llm_secondary_endpoint: layer.llm_secondary_endpoint,
            llm_secondary_model: layer.llm_secondary_model.unwrap_or(defaults.llm_secondary_model),
            from_block: layer.from_block.unwrap_or(defaults.from_block),
            curve_start: layer.curve_start.unwrap_or(defaults.curve_start),
            curve_end: layer.curve_end.unwrap_or(defaults.curve_end),
            curve_ceiling: layer.curve_ceiling.unwrap_or(defaults.curve_ceiling),
        };

        if config.fee_bps > 10_000 {
            bail!("fee_bps must be at most 10000, got {}", config.fee_bps);
        }
        if config.curve_start > config.curve_end {
            bail!("curve_start {} is past curve_end {}", config.curve_start, config.curve_end);
        }
        match config.recipient {
            Some(recipient) if recipient.is_zero() => {
                bail!("recipient must not be the zero address")
            }
            Some(_) => {}
            None => info!("no recipient configured; swaps, redeems and mints will be refused"),
        }
        Ok(config)
    }

    /// The built-in token table, or the configured override.
    pub fn registry(&self) -> anyhow::Result<TokenRegistry> {
        match self.tokens_file.as_deref() {
            Some(path) => load_registry(path),
            None => Ok(TokenRegistry::builtin()),
        }
    }

    pub fn curve_spec(&self) -> CurveSpec {
        CurveSpec { domain: self.curve_start..=self.curve_end, ceiling: self.curve_ceiling }
    }
}

fn parse_address(value: Option<&str>, field: &str) -> anyhow::Result<Option<Address>> {
    value
        .map(|s| Address::from_str(s.trim()).map_err(|e| anyhow!("invalid {field} `{s}`: {e}")))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_layer_wins() {
        let cli = FileConfig { fee_bps: Some(25), ..Default::default() };
        let file = FileConfig { fee_bps: Some(50), from_block: Some(7), ..Default::default() };
        let config = AppConfig::resolve(cli.or(file)).unwrap();
        assert_eq!(config.fee_bps, 25);
        assert_eq!(config.from_block, 7);
        assert_eq!(config.llm_primary_model, "gpt-4o");
        assert_eq!(config.factory_address, DEFAULT_FACTORY_ADDRESS);
    }

    #[test]
    fn rejects_bad_settings() {
        let layer = FileConfig { fee_bps: Some(10_001), ..Default::default() };
        assert!(AppConfig::resolve(layer).is_err());
        let layer = FileConfig { recipient: Some("0x1234".into()), ..Default::default() };
        assert!(AppConfig::resolve(layer).is_err());
        let layer = FileConfig { recipient: Some(Address::ZERO.to_string()), ..Default::default() };
        assert!(AppConfig::resolve(layer).is_err());
        let layer = FileConfig { curve_start: Some(10), curve_end: Some(5), ..Default::default() };
        assert!(AppConfig::resolve(layer).is_err());
    }

    #[test]
    fn reads_toml_layer() {
        let layer: FileConfig = toml::from_str(
            r#"
            recipient = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
            curve_end = 50
            "#,
        )
        .unwrap();
        let config = AppConfig::resolve(layer).unwrap();
        assert_eq!(config.curve_spec().domain, 1..=50);
        assert_eq!(
            config.recipient,
            Some(address!("70997970C51812dc3A010C7d01b50e0d17dc79C8"))
        );
    }

    #[test]
    fn recipient_stays_unset_without_a_layer() {
        let config = AppConfig::resolve(FileConfig::default()).unwrap();
        assert_eq!(config.recipient, None);
        assert_eq!(AppConfig::default().recipient, None);
    }
}
