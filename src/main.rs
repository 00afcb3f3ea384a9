mod branches;
mod cache;
mod config;
mod error;
mod github;
mod logging;
mod orphans;
mod scheduler;
mod summary;
#[cfg(test)]
mod test_utils;
mod web;

use clap::Parser;
use config::{Config, Overrides};
use error::Result;
use github::client::GitHubClient;
use github::Gateway;
use std::process::ExitCode;
use std::sync::Arc;
use web::AppState;

#[derive(Parser)]
#[command(
    name = "branchboard",
    about = "Dashboard of open branches and orphan forks in a GitHub organization"
)]
struct Cli {
    #[arg(long, help = "GitHub organization to inventory")]
    org: Option<String>,

    #[arg(long, help = "Address to serve the dashboard on")]
    bind: Option<String>,

    #[arg(long, help = "Maximum concurrent GitHub requests")]
    concurrency: Option<usize>,

    #[arg(long, default_value = "info", help = "Log level when RUST_LOG is unset")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let config = Config::load(Overrides {
        organization: cli.org,
        bind: cli.bind,
        concurrency: cli.concurrency,
    });
    tracing::debug!(?config, "loaded configuration");

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(config: Config) -> Result<()> {
    let token = config.token()?;
    let org = config.organization()?;

    let client = GitHubClient::new(token)?;
    // one authenticated call up front so a bad token fails before serving
    let identity = client.identity().await?;
    tracing::info!(login = %identity.login, org, "authenticated");

    let state = AppState::new(
        Arc::new(client),
        org,
        identity.display_name(),
        config.concurrency,
    );
    web::serve(Arc::new(state), &config.bind).await
}
