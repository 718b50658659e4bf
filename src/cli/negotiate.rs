use clap::Args;

use crate::cli::OutputFormat;
use crate::matching::negotiation::{negotiate, quality};

#[derive(Args)]
pub struct NegotiateArgs {
    /// Accept list, e.g. "text/*;q=0.5, application/json"
    #[arg(long)]
    pub accept: String,

    /// Comma-separated types the server can provide
    #[arg(long)]
    pub provide: String,
}

/// Execute negotiate subcommand
///
/// # Errors
///
/// Returns an error if a quality value or type string is malformed.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: NegotiateArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    if verbose {
        for wanted in args.accept.split(',').map(str::trim).filter(|w| !w.is_empty()) {
            match quality(wanted) {
                Ok(q) => eprintln!("  {wanted}: q={q}"),
                Err(e) => eprintln!("  {wanted}: {e}"),
            }
        }
    }

    let selected = negotiate(&args.accept, &args.provide)?;

    match format {
        OutputFormat::Text | OutputFormat::Tsv => println!("{selected}"),
        OutputFormat::Json => {
            let json = serde_json::json!({
                "accept": args.accept,
                "provided": args.provide,
                "selected": selected.to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(())
}
