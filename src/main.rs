use clap::Parser;
use tracing_subscriber::EnvFilter;

use mime_sleuth::{cli, web};

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("mime_sleuth=debug,info")
    } else {
        EnvFilter::new("mime_sleuth=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        cli::Commands::Identify(args) => {
            cli::identify::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Negotiate(args) => {
            cli::negotiate::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Rules(args) => {
            cli::rules::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Detectors(args) => {
            cli::detectors::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Serve(args) => {
            web::server::run(args)?;
        }
    }

    Ok(())
}
