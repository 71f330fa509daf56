//! kube-links CLI - Main entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "kube-links")]
#[command(version)]
#[command(about = "Find links between Kubernetes manifests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the language server over stdio
    Lsp,

    /// Print the links found in a manifest file as JSON
    Links {
        /// YAML or JSON manifest
        file: PathBuf,

        /// Treat the manifest as this kind (name or abbreviation, e.g. `pv`)
        #[arg(short, long)]
        kind: Option<String>,

        /// Link configuration file (JSON or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List the resource kinds links can point at
    Kinds {
        /// Link configuration file (JSON or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // stdout belongs to the LSP transport, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kube_links=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Lsp => commands::lsp::execute(),
        Commands::Links { file, kind, config } => {
            commands::links::execute(&file, kind.as_deref(), config.as_deref())
        }
        Commands::Kinds { config } => commands::kinds::execute(config.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_links_arguments() {
        let cli = Cli::try_parse_from(["kube-links", "links", "pv.yaml", "--kind", "pv"]).unwrap();
        match cli.command {
            Commands::Links { file, kind, config } => {
                assert_eq!(file, PathBuf::from("pv.yaml"));
                assert_eq!(kind.as_deref(), Some("pv"));
                assert!(config.is_none());
            }
            _ => panic!("expected links command"),
        }
    }

    #[test]
    fn links_requires_a_file() {
        assert!(Cli::try_parse_from(["kube-links", "links"]).is_err());
    }
}
