//! Command-line interface for mime-sleuth.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **identify**: Classify files, or stdin, by content and name
//! - **negotiate**: Pick the best provided type for an Accept list
//! - **rules**: Compile a magic rule file and report what was accepted
//! - **detectors**: List registered detectors and handlers
//! - **serve**: Start the HTTP API
//!
//! ## Usage
//!
//! ```text
//! # Identify a file
//! mime-sleuth identify photo.png
//!
//! # Pipe content in
//! curl -s https://example.com/logo | mime-sleuth identify -
//!
//! # JSON output for scripting
//! mime-sleuth identify *.bin --format json
//!
//! # Content negotiation
//! mime-sleuth negotiate --accept "text/*;q=0.5, application/json" --provide "text/html,application/json"
//!
//! # Start the API
//! mime-sleuth serve --port 8080
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::registry::{MimeSleuth, SleuthConfig};

pub mod detectors;
pub mod identify;
pub mod negotiate;
pub mod rules;

#[derive(Parser)]
#[command(name = "mime-sleuth")]
#[command(version)]
#[command(about = "Identify file content types from magic bytes and names")]
#[command(
    long_about = "mime-sleuth identifies the MIME type of files, buffers and streams.\n\nEach registered detector proposes candidate types:\n- Magic byte-pattern rules, with nested refinements scoring higher\n- File extension and glob tables\n- Text encoding sniffing\n\nCandidates are merged, and a type proposed by several detectors ranks above one proposed by a single detector."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify the content type of files or stdin
    Identify(identify::IdentifyArgs),

    /// Negotiate a content type from an Accept list
    Negotiate(negotiate::NegotiateArgs),

    /// Compile a magic rule file and list its rules
    Rules(rules::RulesArgs),

    /// List registered detectors and handlers
    Detectors(detectors::DetectorsArgs),

    /// Start the web server
    Serve(ServeArgs),
}

#[derive(clap::Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1")]
    pub address: String,

    /// JSON config file for the detectors
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Options shared by commands that build a detector set
#[derive(clap::Args, Clone, Debug, Default)]
pub struct SleuthArgs {
    /// JSON config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Additional magic rule file (repeatable, `.gz` accepted)
    #[arg(long = "magic")]
    pub magic: Vec<PathBuf>,

    /// Detector id to use instead of the configured set (repeatable)
    #[arg(long = "detector")]
    pub detectors: Vec<String>,

    /// Type reported when nothing matches
    #[arg(long)]
    pub unknown: Option<String>,
}

impl SleuthArgs {
    /// Config file (or defaults) with the command-line overrides applied
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded.
    pub fn config(&self) -> anyhow::Result<SleuthConfig> {
        let mut config = match &self.config {
            Some(path) => SleuthConfig::load_from_file(path)?,
            None => SleuthConfig::default(),
        };
        config.magic_files.extend(self.magic.iter().cloned());
        if !self.detectors.is_empty() {
            config.detectors = Some(self.detectors.clone());
        }
        if let Some(unknown) = &self.unknown {
            config.unknown_mime_type.clone_from(unknown);
        }
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(&self) -> anyhow::Result<MimeSleuth> {
        Ok(MimeSleuth::with_config(&self.config()?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_applied() {
        let args = SleuthArgs {
            magic: vec![PathBuf::from("extra.magic")],
            detectors: vec!["glob".to_string()],
            unknown: Some("application/x-unknown".to_string()),
            ..SleuthArgs::default()
        };
        let config = args.config().unwrap();
        assert_eq!(config.magic_files, vec![PathBuf::from("extra.magic")]);
        assert_eq!(config.detector_ids(), vec!["glob"]);
        assert_eq!(config.unknown_mime_type, "application/x-unknown");
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "mime-sleuth",
            "identify",
            "a.png",
            "--detector",
            "magic",
            "--format",
            "json",
        ])
        .unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
        assert!(matches!(cli.command, Commands::Identify(_)));
    }
}
