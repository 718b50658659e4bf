use clap::Args;

use crate::cli::{OutputFormat, SleuthArgs};

#[derive(Args)]
pub struct DetectorsArgs {
    #[command(flatten)]
    pub sleuth: SleuthArgs,
}

/// Execute detectors subcommand
///
/// # Errors
///
/// Returns an error if the detectors cannot be built.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: DetectorsArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let sleuth = args.sleuth.build()?;
    let detectors = sleuth.detectors();
    let handlers = sleuth.handler_names();

    match format {
        OutputFormat::Text => {
            println!("Detectors (in run order):");
            for detector in &detectors {
                println!("  {}", detector.name());
                println!("    {}", detector.description());
            }
            println!("\nHandlers: {}", handlers.join(", "));
            if verbose {
                println!(
                    "Unknown type: {}\nKnown types: {}",
                    sleuth.unknown_type(),
                    sleuth.known_types().len()
                );
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "detectors": detectors
                    .iter()
                    .map(|d| serde_json::json!({
                        "name": d.name(),
                        "description": d.description(),
                    }))
                    .collect::<Vec<_>>(),
                "handlers": handlers,
                "unknown_mime_type": sleuth.unknown_type().to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Tsv => {
            println!("kind\tname\tdescription");
            for detector in &detectors {
                println!("detector\t{}\t{}", detector.name(), detector.description());
            }
            for handler in &handlers {
                println!("handler\t{handler}\t");
            }
        }
    }
    Ok(())
}
