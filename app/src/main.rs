#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod chain;
mod command;

use command::{
    CommandStrategy, IdentityOverrides, InfoStrategy, InitStrategy, RunInput, RunStrategy,
    ShowInput, ShowStrategy, VersionStrategy,
};

#[derive(Parser)]
#[command(name = "turnip")]
#[command(about = "Run cached, logged multi-turn LLM conversations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct IdentityArgs {
    /// Project label (defaults to the config file's identity)
    #[arg(long)]
    project: Option<String>,

    /// Experiment label
    #[arg(long)]
    experiment: Option<String>,

    /// Run label
    #[arg(long)]
    run: Option<String>,

    /// Instance label
    #[arg(long)]
    instance: Option<String>,
}

impl From<IdentityArgs> for IdentityOverrides {
    fn from(args: IdentityArgs) -> Self {
        Self {
            project: args.project,
            experiment: args.experiment,
            run: args.run,
            instance: args.instance,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a conversation
    Run {
        /// Opening prompt
        #[arg(short = 'p', long)]
        prompt: String,

        /// Prompt sent on every later turn
        #[arg(long, default_value = "Continue.")]
        follow_up: String,

        /// Number of turns
        #[arg(short = 't', long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
        turns: u16,

        #[command(flatten)]
        identity: IdentityArgs,

        /// Provider parameter as key=value (value parsed as JSON), repeatable
        #[arg(long = "param", value_parser = command::parse_param)]
        params: Vec<(String, Value)>,

        /// Skip the completion cache
        #[arg(long)]
        no_cache: bool,

        /// Skip the result log
        #[arg(long)]
        no_log: bool,
    },
    /// Print logged turns as JSON
    Show {
        #[command(flatten)]
        identity: IdentityArgs,

        /// Turn number; prints the whole run when omitted
        #[arg(long)]
        turn: Option<u32>,
    },
    /// Show configuration information
    Info,
    /// Initialize configuration
    Init,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            prompt,
            follow_up,
            turns,
            identity,
            params,
            no_cache,
            no_log,
        } => {
            RunStrategy
                .execute(RunInput {
                    prompt,
                    follow_up,
                    turns: usize::from(turns),
                    identity: identity.into(),
                    parameters: params,
                    no_cache,
                    no_log,
                })
                .await
        }
        Commands::Show { identity, turn } => {
            ShowStrategy
                .execute(ShowInput {
                    identity: identity.into(),
                    turn,
                })
                .await
        }
        Commands::Info => InfoStrategy.execute(()).await,
        Commands::Init => InitStrategy.execute(()).await,
        Commands::Version => VersionStrategy.execute(()).await,
    }
}
