//! VibeKit CLI - run a single generation against a configured agent.
//!
//! Streamed chunks go to stdout; logs go to stderr (`RUST_LOG` controls verbosity).

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use vibekit::agents::AgentMode;
use vibekit::{StreamCallbacks, VibeKit, VibeKitConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Answer without modifying the repository
    Ask,
    /// Let the agent edit the repository
    Code,
}

impl From<Mode> for AgentMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Ask => AgentMode::Ask,
            Mode::Code => AgentMode::Code,
        }
    }
}

/// Run a coding agent in a sandbox against a GitHub repository.
#[derive(Debug, Parser)]
#[command(name = "vibekit", version, about)]
struct Args {
    /// Path to the YAML or JSON configuration file
    config: PathBuf,

    /// Override the mode from the configuration
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Open a pull request with the agent's changes afterwards
    #[arg(long)]
    pr: bool,

    /// Prompt for the agent; multiple words are joined with spaces
    #[arg(required = true)]
    prompt: Vec<String>,
}

impl Args {
    fn prompt(&self) -> String {
        self.prompt.join(" ")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vibekit=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = VibeKitConfig::from_path(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    config.apply_env_defaults();

    let vibekit = VibeKit::new(config)?;
    let callbacks = StreamCallbacks::new()
        .on_update(|chunk| println!("{}", chunk))
        .on_error(|err| eprintln!("{}", err));

    let result = vibekit
        .generate(&args.prompt(), args.mode.map(AgentMode::from), None, Some(&callbacks))
        .await?;
    tracing::info!(
        sandbox_id = %result.sandbox_id,
        exit_code = result.exit_code,
        "Generation complete"
    );

    if args.pr {
        let pr = vibekit.create_pull_request().await?;
        tracing::info!(number = pr.number, url = %pr.html_url, "Pull request opened");
        println!("{}", pr.html_url);
    }

    if let Some(session) = vibekit.get_session().await? {
        eprintln!("session: {}", session);
    }
    Ok(())
}
