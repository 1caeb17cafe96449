use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use ck_harvest::config::HarvestConfig;
use ck_harvest::github::{self, GithubSearchClient};
use ck_harvest::pipeline;
use ck_harvest::report;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch top repositories, clone and analyze each, then build the report
    Run {
        #[clap(short, long, default_value = "harvest.yaml")]
        config: PathBuf,
    },
    /// Fetch and list the repositories the configured search would harvest
    Fetch {
        #[clap(short, long, default_value = "harvest.yaml")]
        config: PathBuf,
    },
    /// Rebuild the consolidated report from an existing results tree
    Report {
        #[clap(short, long, default_value = "harvest.yaml")]
        config: PathBuf,
    },
    /// Write a default configuration file
    Init {
        #[clap(short, long, default_value = "harvest.yaml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    match args.command {
        Commands::Run { config } => {
            info!("Running harvest with config: {}", config.display());
            let config = HarvestConfig::from_file(&config)?;
            pipeline::run_harvest(&config).await?;
        }
        Commands::Fetch { config } => {
            let config = HarvestConfig::from_file(&config)?;
            let token = config.resolve_token()?;
            let client = GithubSearchClient::new(token, config.search_term(), config.page_size)?;
            let repositories =
                github::collect_repositories(&client, config.max_repositories).await?;
            for repository in &repositories {
                println!("{}\t{}", repository.name, repository.url);
            }
            info!("Fetched {} repositories", repositories.len());
        }
        Commands::Report { config } => {
            let config = HarvestConfig::from_file(&config)?;
            let summary = report::aggregate_results(&config.results_dir, &config.report_path)?;
            info!(
                "Appended {} metric rows from {} CSV files to {}",
                summary.rows_appended,
                summary.files_read,
                config.report_path.display()
            );
        }
        Commands::Init { config } => {
            info!("Writing default config: {}", config.display());
            let serialized = serde_yaml::to_string(&HarvestConfig::default())?;
            std::fs::write(&config, serialized)?;
        }
    }

    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level.to_string()))
        .without_time()
        .init();
}
