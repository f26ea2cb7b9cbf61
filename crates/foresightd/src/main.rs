//! foresightd — the Foresight daemon.
//!
//! Single binary that assembles the predictive autoscaler:
//! - State store (redb)
//! - Prediction runner, tuning hooks and model router
//! - Reconcile controller (work queue + worker pool + resync)
//! - REST API
//!
//! It is also the prediction kernel worker: the process runner re-invokes
//! this binary as `foresightd kernel <algorithm>`.
//!
//! # Usage
//!
//! ```text
//! foresightd run --config /etc/foresight/foresightd.toml
//! foresightd kernel algorithms/linear_regression < params.json
//! foresightd validate --file autoscaler.json
//! foresightd default-config > foresightd.toml
//! ```

mod config;
mod daemon;
mod kernel_mode;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use foresight_state::PredictiveAutoscaler;
use tracing_subscriber::EnvFilter;

use crate::config::DaemonConfig;

#[derive(Parser)]
#[command(name = "foresightd", about = "Foresight predictive autoscaler daemon")]
struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run the controller and REST API.
    Run {
        /// Path to a foresightd.toml file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Data directory for persistent state.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Address the REST API listens on.
        #[arg(long)]
        listen: Option<SocketAddr>,

        /// Number of reconcile workers.
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Run a prediction kernel: JSON parameters on stdin, forecast on stdout.
    Kernel {
        /// Algorithm id, e.g. `algorithms/linear_regression`.
        algorithm: String,
    },

    /// Print the default configuration as TOML.
    DefaultConfig,

    /// Validate an autoscaler JSON document.
    Validate {
        /// Path to the autoscaler document.
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Kernel workers only report problems; their stdout is the result.
    let default_filter = match cli.command {
        Command::Kernel { .. } | Command::DefaultConfig => "warn",
        _ => "info,foresightd=debug,foresight=debug",
    };
    init_tracing(cli.log_format, default_filter);

    match cli.command {
        Command::Run {
            config,
            data_dir,
            listen,
            workers,
        } => {
            let mut config = match config {
                Some(path) => DaemonConfig::from_file(&path)?,
                None => DaemonConfig::default(),
            };
            if let Some(data_dir) = data_dir {
                config.data_dir = data_dir;
            }
            if let Some(listen) = listen {
                config.listen = listen;
            }
            if let Some(workers) = workers {
                config.controller.workers = workers;
            }
            daemon::run(config).await
        }
        Command::Kernel { algorithm } => kernel_mode::run(&algorithm),
        Command::DefaultConfig => {
            print!("{}", DaemonConfig::default().to_toml_string()?);
            Ok(())
        }
        Command::Validate { file } => validate_file(&file),
    }
}

fn init_tracing(format: LogFormat, default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn validate_file(path: &std::path::Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)?;
    let autoscaler: PredictiveAutoscaler = serde_json::from_str(&content)?;
    foresight_autoscale::validate(&autoscaler)?;
    println!("{} is valid", autoscaler.key());
    Ok(())
}
