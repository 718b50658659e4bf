use std::io::Read;
use std::path::PathBuf;

use clap::Args;

use crate::cli::{OutputFormat, SleuthArgs};
use crate::core::result_set::MimeTypeSet;
use crate::registry::MimeSleuth;

#[derive(Args)]
pub struct IdentifyArgs {
    /// Files to identify. Use '-' to read content from stdin
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    #[command(flatten)]
    pub sleuth: SleuthArgs,

    /// Only report the most specific type
    #[arg(long)]
    pub most_specific: bool,
}

/// Execute identify subcommand
///
/// # Errors
///
/// Returns an error if the detectors cannot be built or stdin cannot be read.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: IdentifyArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let sleuth = args.sleuth.build()?;

    if verbose {
        eprintln!(
            "Using {} detectors, handlers: {}",
            sleuth.detectors().len(),
            sleuth.handler_names().join(", ")
        );
    }

    let mut results = Vec::with_capacity(args.inputs.len());
    for input in &args.inputs {
        let label = input.display().to_string();
        let result = if label == "-" {
            let mut data = Vec::new();
            std::io::stdin().read_to_end(&mut data)?;
            sleuth.classify_bytes(&data)
        } else {
            if !input.exists() {
                eprintln!("Warning: {label} does not exist");
            }
            sleuth.classify_path(input)
        };
        results.push((label, result));
    }

    match format {
        OutputFormat::Text => print_text_results(&results, args.most_specific),
        OutputFormat::Json => print_json_results(&results, args.most_specific)?,
        OutputFormat::Tsv => print_tsv_results(&results, args.most_specific),
    }

    Ok(())
}

fn most_specific_str(result: &MimeTypeSet) -> String {
    MimeSleuth::most_specific(result)
        .map(ToString::to_string)
        .unwrap_or_default()
}

fn print_text_results(results: &[(String, MimeTypeSet)], most_specific: bool) {
    for (label, result) in results {
        if most_specific {
            println!("{label}: {}", most_specific_str(result));
            continue;
        }
        let types: Vec<String> = result
            .detected()
            .map(|d| match &d.encoding {
                Some(encoding) => format!(
                    "{}; charset={} ({})",
                    d.mime_type,
                    encoding,
                    d.mime_type.specificity()
                ),
                None => format!("{} ({})", d.mime_type, d.mime_type.specificity()),
            })
            .collect();
        println!("{label}: {}", types.join(", "));
    }
}

fn print_json_results(results: &[(String, MimeTypeSet)], most_specific: bool) -> anyhow::Result<()> {
    let output: Vec<serde_json::Value> = results
        .iter()
        .map(|(label, result)| {
            let mut json = serde_json::json!({
                "input": label,
                "most_specific": most_specific_str(result),
            });
            if !most_specific {
                json["types"] = result
                    .detected()
                    .map(|d| {
                        serde_json::json!({
                            "type": d.mime_type.to_string(),
                            "specificity": d.mime_type.specificity(),
                            "encoding": d.encoding,
                        })
                    })
                    .collect();
            }
            json
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv_results(results: &[(String, MimeTypeSet)], most_specific: bool) {
    if most_specific {
        println!("input\ttype");
        for (label, result) in results {
            println!("{label}\t{}", most_specific_str(result));
        }
        return;
    }
    println!("input\ttype\tspecificity\tencoding");
    for (label, result) in results {
        for d in result.detected() {
            println!(
                "{label}\t{}\t{}\t{}",
                d.mime_type,
                d.mime_type.specificity(),
                d.encoding.as_deref().unwrap_or("")
            );
        }
    }
}
