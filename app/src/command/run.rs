use serde_json::Value;
use tracing::info;
use turnip_config::Config;
use turnip_core::ParameterBag;

use super::{IdentityOverrides, StoreSelection, build_runner};
use crate::chain::{ChainConversation, ChainState};

/// Input parameters for the Run command strategy.
#[derive(Debug, Clone)]
pub struct RunInput {
    /// Opening prompt
    pub prompt: String,
    /// Prompt sent on every turn after the first
    pub follow_up: String,
    /// Number of turns to run
    pub turns: usize,
    pub identity: IdentityOverrides,
    /// Parameters layered over the config file's defaults
    pub parameters: Vec<(String, Value)>,
    pub no_cache: bool,
    pub no_log: bool,
}

/// Strategy for executing the Run command.
///
/// - Loads configuration and builds the provider
/// - Attaches the database cache and result log unless disabled
/// - Drives a chained conversation and prints each response
#[derive(Debug, Clone, Copy)]
pub struct RunStrategy;

impl super::CommandStrategy for RunStrategy {
    type Input = RunInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        let identity = input.identity.apply(config.identity.clone());
        let mut parameters = config.parameters.clone();
        parameters.merge(&input.parameters.into_iter().collect::<ParameterBag>());

        let stores = StoreSelection {
            cache: config.cache.enabled && !input.no_cache,
            result_log: config.result_log.enabled && !input.no_log,
        };
        let hooks = ChainConversation::new(input.follow_up, input.turns);
        let runner = build_runner(&config, hooks, stores).await?;

        info!("Running {} turn(s) as {identity}", input.turns);
        let outcome = runner
            .run(ChainState::new(input.prompt), &identity, Some(&parameters))
            .await?;

        for (turn, response) in outcome.state.responses.iter().enumerate() {
            println!("[turn {turn}]");
            println!("{response}");
            println!();
        }

        info!("Conversation {identity} completed in {} turn(s)", outcome.turns);
        Ok(())
    }
}

/// Parse a `key=value` parameter; the value is read as JSON and falls back
/// to a plain string.
pub fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing parameter name in `{raw}`"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
