mod commands;
mod config;
mod corpus;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use commands::graph::{cmd_graph, GraphArgs};
use commands::resolve::cmd_resolve;
use commands::tree::cmd_tree;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Cross-file process map builder.
#[derive(Parser)]
#[command(name = "procmap", version, about = "Cross-file process map builder")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to a procmap.toml config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter when RUST_LOG is not set (e.g. "debug", "procmap_core=trace")
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the unified cross-file graph
    Graph {
        /// Directory of parse documents (*.json)
        dir: PathBuf,
        /// Reference map JSON file
        #[arg(long)]
        map: Option<PathBuf>,
        /// Preferred root (file name, process id, or process node id)
        #[arg(long)]
        root: Option<String>,
        /// Write auto-accepted matches back into the reference map
        #[arg(long)]
        write_back: bool,
    },

    /// Build the ordered process tree
    Tree {
        /// Directory of parse documents (*.json)
        dir: PathBuf,
        /// Reference map JSON file
        #[arg(long)]
        map: Option<PathBuf>,
        /// Root process (file name, process id, or process node id)
        #[arg(long)]
        root: Option<String>,
    },

    /// Show how every invocation point resolves
    Resolve {
        /// Directory of parse documents (*.json)
        dir: PathBuf,
        /// Reference map JSON file
        #[arg(long)]
        map: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e.to_string(), cli.output, cli.quiet);
            process::exit(1);
        }
    };

    let result = match &cli.command {
        Commands::Graph {
            dir,
            map,
            root,
            write_back,
        } => cmd_graph(
            &GraphArgs {
                dir,
                map: map.as_deref(),
                root: root.as_deref(),
                write_back: *write_back,
            },
            &config,
            cli.output,
            cli.quiet,
        ),
        Commands::Tree { dir, map, root } => cmd_tree(
            dir,
            map.as_deref(),
            root.as_deref(),
            &config,
            cli.output,
            cli.quiet,
        ),
        Commands::Resolve { dir, map } => {
            cmd_resolve(dir, map.as_deref(), &config, cli.output, cli.quiet)
        }
    };

    if let Err(e) = result {
        report_error(&e.to_string(), cli.output, cli.quiet);
        process::exit(1);
    }
}

/// Logs go to stderr so that stdout stays machine-readable.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init();
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
