//! Keel CLI - partition rendered charts and wait for releases to become ready

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;

#[derive(Parser)]
#[command(name = "keel")]
#[command(author = "Keel Contributors")]
#[command(version)]
#[command(about = "Order rendered Kubernetes manifests and wait for them to become ready", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human readable summary
    #[default]
    Text,
    /// The full partition as JSON
    Json,
    /// Ordered manifests in the stored `# Source:` format
    Manifest,
}

#[derive(Subcommand)]
enum Commands {
    /// Split rendered templates into hooks, ordered manifests and notes
    Partition {
        /// Directory holding rendered templates (e.g. `helm template --output-dir`)
        dir: PathBuf,

        /// Order manifests for removal instead of installation
        #[arg(long)]
        uninstall: bool,

        /// API versions served by the cluster (group/version), repeatable
        #[arg(long = "api-versions", value_delimiter = ',')]
        api_versions: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Wait until matching resources are ready
    Wait {
        /// Namespace to watch
        #[arg(short, long, env = "KEEL_NAMESPACE", default_value = "default")]
        namespace: String,

        /// Resource kind (pod, service, pvc, deployment)
        #[arg(short, long)]
        kind: String,

        /// Label selector (key=value,...)
        #[arg(short = 'l', long, conflicts_with = "name", required_unless_present = "name")]
        selector: Option<String>,

        /// Object name
        #[arg(long)]
        name: Option<String>,

        /// Time between polls
        #[arg(long, env = "KEEL_WAIT_INTERVAL", default_value = "2s", value_parser = parse_duration)]
        interval: Duration,

        /// Give up after this long
        #[arg(long, env = "KEEL_WAIT_TIMEOUT", default_value = "5m", value_parser = parse_duration)]
        timeout: Duration,
    },
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(s).map_err(|e| e.to_string())
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("KEEL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = match cli.command {
        Commands::Partition {
            dir,
            uninstall,
            api_versions,
            output,
        } => commands::partition::run(&dir, uninstall, &api_versions, output),

        Commands::Wait {
            namespace,
            kind,
            selector,
            name,
            interval,
            timeout,
        } => {
            commands::wait::run(
                &namespace,
                &kind,
                selector.as_deref(),
                name.as_deref(),
                interval,
                timeout,
            )
            .await
        }
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
