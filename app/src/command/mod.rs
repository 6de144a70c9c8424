//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy with its own input type, dispatched
//! statically from `main`.

use std::sync::Arc;

use tracing::info;
use turnip_config::Config;
use turnip_core::{ConversationHooks, ConversationRunner, Identity};
use turnip_providers::OpenAiCompatibleProvider;
use turnip_store::{DatabaseCache, DatabaseResultLog};

mod info;
mod init;
mod run;
mod show;
mod version;

pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use run::{RunInput, RunStrategy, parse_param};
pub use show::{ShowInput, ShowStrategy};
pub use version::VersionStrategy;

/// Core trait defining the contract for all command strategies.
///
/// # Example
/// ```rust,ignore
/// struct MyStrategy;
///
/// impl CommandStrategy for MyStrategy {
///     type Input = MyInput;
///
///     async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
///         // Command logic here
///         Ok(())
///     }
/// }
/// ```
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Identity labels given on the command line; unset labels fall back to the
/// config file.
#[derive(Debug, Clone, Default)]
pub struct IdentityOverrides {
    pub project: Option<String>,
    pub experiment: Option<String>,
    pub run: Option<String>,
    pub instance: Option<String>,
}

impl IdentityOverrides {
    #[must_use]
    pub fn apply(self, base: Identity) -> Identity {
        Identity {
            project: self.project.unwrap_or(base.project),
            experiment: self.experiment.unwrap_or(base.experiment),
            run: self.run.unwrap_or(base.run),
            instance: self.instance.unwrap_or(base.instance),
        }
    }
}

/// Which database stores a command wants.
#[derive(Debug, Clone, Copy)]
struct StoreSelection {
    cache: bool,
    result_log: bool,
}

/// Build a runner for `hooks` from the config, attaching the selected
/// database stores over one shared connection.
async fn build_runner<H: ConversationHooks>(
    config: &Config,
    hooks: H,
    stores: StoreSelection,
) -> anyhow::Result<ConversationRunner<H, OpenAiCompatibleProvider>> {
    let provider = OpenAiCompatibleProvider::from_config(&config.provider)?;
    info!(
        "Using {} provider: model={}",
        config.provider.kind.as_str(),
        provider.model()
    );

    let mut runner = ConversationRunner::new(hooks, provider);
    if !stores.cache && !stores.result_log {
        info!("Running without cache or result log");
        return Ok(runner);
    }

    let db = turnip_store::connect(&config.database.url).await?;

    if stores.cache {
        let cache = DatabaseCache::from_connection(db.clone());
        cache.init_schema().await?;
        runner = runner.with_cache(Arc::new(cache));
    }

    if stores.result_log {
        let result_log = DatabaseResultLog::from_connection(db);
        result_log.init_schema().await?;
        runner = runner.with_result_log(Arc::new(result_log));
    }

    Ok(runner)
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    }
}

fn mask_database_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };

    let Some((credentials, after_at)) = rest.split_once('@') else {
        return url.to_string();
    };

    let Some((username, _password)) = credentials.split_once(':') else {
        return url.to_string();
    };

    format!("{scheme}://{username}:***@{after_at}")
}
