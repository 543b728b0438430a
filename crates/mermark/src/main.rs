//! mermark CLI - Markdown with Mermaid diagrams.
//!
//! Provides commands for:
//! - `render`: Render a document to an HTML fragment
//! - `export`: Export a document to a paginated PDF (or print-ready HTML)
//! - `watch`: Keep an HTML preview of a file up to date

mod commands;
mod error;
mod input;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CommonArgs, ExportArgs, RenderArgs, WatchArgs};
use output::Output;

/// mermark - Markdown and Mermaid preview and export.
#[derive(Parser)]
#[command(name = "mermark", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a document to HTML once every diagram has settled.
    Render(RenderArgs),
    /// Export a document to a paginated PDF.
    Export(ExportArgs),
    /// Watch a file and keep an HTML preview up to date.
    Watch(WatchArgs),
}

impl Commands {
    fn common(&self) -> &CommonArgs {
        match self {
            Self::Render(args) => &args.common,
            Self::Export(args) => &args.common,
            Self::Watch(args) => &args.common,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.common().verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let result = rt.block_on(async {
        match cli.command {
            Commands::Render(args) => args.execute().await,
            Commands::Export(args) => args.execute().await,
            Commands::Watch(args) => args.execute().await,
        }
    });

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
