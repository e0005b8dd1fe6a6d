//! Command-line interface definitions.
//!
//! The CLI is a thin wrapper: everything of substance lives in the YAML
//! configuration, and the flags here only say where to find it (plus
//! optional store-path overrides for one-off runs).

use clap::Parser;

/// Command-line arguments for the article refinery.
///
/// # Examples
///
/// ```sh
/// # Run with the default config.yaml in the working directory
/// article_refinery
///
/// # Explicit config, overriding the input store
/// article_refinery -c conf/refinery.yaml -i data/backlog.csv
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config: String,

    /// Override the configured input store path
    #[arg(short, long)]
    pub input: Option<String>,

    /// Override the configured output store path
    #[arg(short, long)]
    pub output: Option<String>,
}
