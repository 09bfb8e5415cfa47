use anyhow::Result;
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use labsync::config::DEFAULT_CONFIG_FILE;
use labsync::gitlab::GitLabApi;
use labsync::{output, Config, GitCli, GitLabClient, Runner, SyncSummary};

#[derive(Parser)]
#[command(name = "labsync")]
#[command(about = "Clone or pull every repository of your GitLab groups")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));

    init_logging(cli.verbose)?;
    info!("Starting labsync v{}", env!("CARGO_PKG_VERSION"));

    let config = match Config::load(&cli.config) {
        Ok(config) => {
            output::plain(format!(
                "Configuration initialized successfully: {}",
                cli.config.display()
            ));
            config
        }
        Err(e) => {
            output::failure(format!("Configuration initialized failed:{:#}", e));
            return Ok(());
        }
    };

    let client = connect(&config);
    let api = client.as_ref().map(|client| client as &dyn GitLabApi);

    let runner = Runner::new(&config, api, GitCli::new())?;
    match runner.run().await {
        Ok(summary) => {
            print_summary(&summary);
            output::banner("******** All executed! ********");
        }
        Err(e) => {
            output::failure(format!("{:#}", e));
        }
    }

    Ok(())
}

/// Accept the single-dash `-version` spelling alongside `--version`
///
/// clap would otherwise read `-version` as a cluster of short flags. A value
/// given to `-c` is passed through as written.
fn normalize_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut expects_value = false;

    args.into_iter()
        .map(|arg| {
            let arg = if !expects_value && arg == "-version" {
                OsString::from("--version")
            } else {
                arg
            };
            expects_value = arg == "-c" || arg == "--config";
            arg
        })
        .collect()
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

/// Build the GitLab client when both URL and token are configured
fn connect(config: &Config) -> Option<GitLabClient> {
    if !config.has_api_credentials() {
        info!("GitLab url or token not configured, group sync disabled");
        return None;
    }

    match GitLabClient::new(config) {
        Ok(client) => {
            output::plain(format!("Client initialization succeeded: {}", config.url));
            Some(client)
        }
        Err(e) => {
            output::failure(format!("Client initialized failed:{:#}", e));
            None
        }
    }
}

fn print_summary(summary: &SyncSummary) {
    output::plain(format!(
        "Repositories: {} cloned, {} pulled ({} switched to master), {} failed, {} skipped \
         in {:.2}s",
        summary.cloned,
        summary.pulled,
        summary.switched,
        summary.failed,
        summary.skipped,
        summary.duration.as_secs_f64()
    ));
}
