use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use npm_publish_check::check::{
    Checker, Status, render_check_report, render_trigger_report, select_packages,
};
use npm_publish_check::config::{self, CheckConfig};
use npm_publish_check::remote::{GitClient, JenkinsClient, NpmRegistry};

#[derive(Parser)]
#[command(name = "npm-publish-check")]
#[command(
    version,
    about = "Find npm packages whose git version is ahead of the registry and trigger their Jenkins jobs"
)]
struct Cli {
    /// Log debug output
    #[arg(long, global = true)]
    verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a commented default config to the current directory
    Init {
        /// File name without extension
        #[arg(long)]
        name: Option<String>,
    },
    /// Compare git and published versions
    Check {
        /// Config file to use
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Tags to check instead of the configured checkTags
        #[arg(short, long, value_delimiter = ',', value_name = "TAG")]
        tags: Vec<String>,

        /// Trigger the Jenkins job of every updatable package
        #[arg(short, long)]
        jenkins: bool,

        /// Log failures as errors and show the failing URL
        #[arg(long)]
        on_error: bool,
    },
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

async fn run_check(
    config: CheckConfig,
    tags: &[String],
    trigger: bool,
    on_error: bool,
) -> anyhow::Result<()> {
    let items = select_packages(&config, Some(tags));
    if items.is_empty() {
        warn!("No packages configured for the requested tags");
    }

    let git = GitClient::from_config(&config.git);
    let registry = NpmRegistry::new();
    let jenkins = JenkinsClient::new();
    let checker = Checker::new(&git, &registry, &jenkins)
        .with_policy(config.pre_release.into())
        .with_jenkins_cookie(config.jenkins.as_ref().and_then(|j| j.cookie.clone()))
        .with_error_reporting(on_error);

    let items = checker.collect_versions(items).await;
    println!("{}", render_check_report(&items, on_error));

    if !trigger {
        return Ok(());
    }

    let (targets, skipped): (Vec<_>, Vec<_>) = items
        .into_iter()
        .filter(|item| item.status() == Status::Updatable)
        .partition(|item| item.jenkins_url.is_some());
    for item in &skipped {
        info!("{} has no Jenkins job, skipping", item.label());
    }
    if targets.is_empty() {
        println!("\nNothing to trigger");
        return Ok(());
    }

    let triggered = checker.trigger_jenkins(targets).await;
    println!("\n{}", render_trigger_report(&triggered));
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Command::Init { name } => {
            let path = config::write_default_config(name.as_deref())?;
            println!("Created {}", path.display());
            Ok(())
        }
        Command::Check {
            config: config_file,
            tags,
            jenkins,
            on_error,
        } => {
            let path = config::config_path(config_file.as_deref());
            let config = config::load_config(&path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(run_check(config, &tags, jenkins, on_error))
        }
    }
}
