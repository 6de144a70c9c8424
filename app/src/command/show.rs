use turnip_config::Config;
use turnip_core::ResultLog;
use turnip_store::DatabaseResultLog;

use super::IdentityOverrides;

/// Input parameters for the Show command strategy.
#[derive(Debug, Clone)]
pub struct ShowInput {
    pub identity: IdentityOverrides,
    /// Single turn to print; every turn of the run when absent
    pub turn: Option<u32>,
}

/// Strategy for printing logged turns as JSON.
#[derive(Debug, Clone, Copy)]
pub struct ShowStrategy;

impl super::CommandStrategy for ShowStrategy {
    type Input = ShowInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let identity = input.identity.apply(config.identity.clone());
        let result_log = DatabaseResultLog::connect(&config.database.url).await?;

        if let Some(turn) = input.turn {
            let record = result_log
                .fetch(&identity, turn)
                .await?
                .ok_or_else(|| anyhow::anyhow!("No record for turn {turn} of {identity}"))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            return Ok(());
        }

        let records = result_log.list_run(&identity).await?;
        if records.is_empty() {
            anyhow::bail!("No records for {identity}");
        }
        println!("{}", serde_json::to_string_pretty(&records)?);
        Ok(())
    }
}
