use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "markpane", version, about = "Convert markdown to HTML")]
struct Args {
    /// Log progress at info level (otherwise RUST_LOG applies)
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    /// The command to execute
    #[command(subcommand)]
    command: MarkpaneCommand,
}

#[derive(Parser)]
struct ConvertArgs {
    /// The markdown file to convert, or `-` for standard input
    input: PathBuf,

    /// Write the result to this file instead of standard output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Wrap the fragment in a complete HTML page
    #[arg(short, long, default_value = "false", conflicts_with = "json")]
    standalone: bool,

    /// Print the fragment and its headings as JSON
    #[arg(long, default_value = "false")]
    json: bool,

    /// The path to the configuration file
    #[arg(short, long)]
    config_file: Option<PathBuf>,
}

#[derive(Parser)]
struct WatchArgs {
    /// The markdown file to watch
    input: PathBuf,

    /// The HTML file to keep up to date
    #[arg(short, long)]
    output: PathBuf,

    /// Write the bare fragment instead of a complete HTML page
    #[arg(long, default_value = "false")]
    fragment: bool,

    /// The path to the configuration file
    #[arg(short, long)]
    config_file: Option<PathBuf>,
}

#[derive(Parser)]
struct InitArgs {
    /// The directory to write markpane.yaml into
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Whether to create the directory if it doesn't exist
    #[arg(short, long, default_value = "false")]
    create: bool,

    /// Replace an existing markpane.yaml
    #[arg(short, long, default_value = "false")]
    force: bool,
}

#[derive(Subcommand)]
enum MarkpaneCommand {
    /// Convert a markdown file to HTML
    Convert(ConvertArgs),

    /// Re-convert a markdown file whenever it changes
    Watch(WatchArgs),

    /// Write a default markpane.yaml
    Init(InitArgs),
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    // Standard output carries converted documents, so logs go to stderr
    let filter = if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        MarkpaneCommand::Convert(args) => {
            commands::convert::run(&args).await?;
        }
        MarkpaneCommand::Watch(args) => {
            commands::watch::run(&args).await?;
        }
        MarkpaneCommand::Init(args) => {
            commands::init::run(&args).await?;
        }
    }

    Ok(())
}
