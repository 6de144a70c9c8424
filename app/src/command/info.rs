use tracing::info;
use turnip_config::Config;
use turnip_providers::OpenAiCompatibleProvider;

use super::{mask_database_url, mask_secret};

/// Strategy for displaying configuration information.
///
/// This strategy outputs:
/// - Provider kind, endpoint, model and API key (masked)
/// - Database URL and connection status
/// - Store toggles, default identity and default parameters
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        println!("=== turnip Configuration ===\n");

        println!("Provider:");
        println!("  Kind: {}", config.provider.kind.as_str());
        match OpenAiCompatibleProvider::from_config(&config.provider) {
            Ok(provider) => {
                println!("  Endpoint: {}", provider.base_url());
                println!("  Model: {}", provider.model());
            }
            Err(e) => println!("  Error: {e}"),
        }
        match config.provider.api_key() {
            Some(key) => println!("  API Key: {}", mask_secret(&key)),
            None => println!(
                "  API Key: (not set, {} unset)",
                config.provider.kind.api_key_env()
            ),
        }
        let retry = &config.provider.retry;
        println!(
            "  Retry: delays={:?}, final_retries={}, final_delay={}s",
            retry.base_delays, retry.final_retries, retry.final_delay
        );
        println!();

        println!("Database:");
        println!("  URL: {}", mask_database_url(&config.database.url));

        info!("Testing database connection");
        match turnip_store::connect(&config.database.url).await {
            Ok(_) => println!("  Status: Connected"),
            Err(e) => {
                println!("  Status: Connection failed");
                println!("  Error: {e}");
            }
        }
        println!();

        println!("Stores:");
        println!("  Cache: {}", enabled(config.cache.enabled));
        println!("  Result Log: {}", enabled(config.result_log.enabled));
        println!();

        println!("Default Identity: {}", config.identity);
        println!(
            "Default Parameters: {}",
            serde_json::to_string(&config.parameters)?
        );

        Ok(())
    }
}

const fn enabled(flag: bool) -> &'static str {
    if flag { "enabled" } else { "disabled" }
}
