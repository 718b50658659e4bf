use std::path::PathBuf;

use clap::Args;

use crate::catalog::store::read_rule_file;
use crate::cli::OutputFormat;
use crate::parsing::entry::{Endian, Offset, OffsetBase, ValueType};
use crate::parsing::magic::{compile, MagicParseError, MagicRuleSet, RuleId};

#[derive(Args)]
pub struct RulesArgs {
    /// Magic rule file (`.gz` accepted)
    pub file: PathBuf,

    /// Also list nested rules
    #[arg(long)]
    pub all: bool,
}

/// Execute rules subcommand
///
/// # Errors
///
/// Returns an error if the rule file cannot be read.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: RulesArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let text = read_rule_file(&args.file)?;
    let source = args.file.display().to_string();
    let report = compile(&source, &text);

    if verbose {
        eprintln!(
            "Compiled {} top-level rules ({} nodes), rejected {} groups",
            report.rules.len(),
            report.rules.node_count(),
            report.rejected.len()
        );
    }

    let rows = collect_rows(&report.rules, args.all);
    match format {
        OutputFormat::Text => print_text(&rows, &report.rejected),
        OutputFormat::Json => print_json(&rows, &report.rejected)?,
        OutputFormat::Tsv => print_tsv(&rows),
    }
    Ok(())
}

struct RuleRow {
    line: usize,
    depth: usize,
    offset: String,
    value_type: String,
    mime_type: Option<String>,
    descendants: usize,
}

fn collect_rows(rules: &MagicRuleSet, all: bool) -> Vec<RuleRow> {
    let mut rows = Vec::new();
    for &root in rules.roots() {
        push_rows(rules, root, all, &mut rows);
    }
    rows
}

fn push_rows(rules: &MagicRuleSet, id: RuleId, all: bool, rows: &mut Vec<RuleRow>) {
    let node = rules.node(id);
    rows.push(RuleRow {
        line: node.line,
        depth: node.entry.depth,
        offset: describe_offset(&node.entry.offset),
        value_type: describe_type(&node.entry.value_type),
        mime_type: node.mime_type().map(ToString::to_string),
        descendants: count_descendants(rules, id),
    });
    if all {
        for &child in &node.children {
            push_rows(rules, child, all, rows);
        }
    }
}

fn count_descendants(rules: &MagicRuleSet, id: RuleId) -> usize {
    rules
        .node(id)
        .children
        .iter()
        .map(|&child| 1 + count_descendants(rules, child))
        .sum()
}

fn describe_base(base: &OffsetBase) -> String {
    match base {
        OffsetBase::Absolute(offset) => offset.to_string(),
        OffsetBase::Relative(delta) => format!("&{delta}"),
    }
}

fn describe_offset(offset: &Offset) -> String {
    match offset {
        Offset::Direct(base) => describe_base(base),
        Offset::Indirect {
            base,
            width,
            endian,
            adjust,
        } => {
            let endian = match endian {
                Endian::Big => "be",
                Endian::Little => "le",
                Endian::Native => "",
            };
            format!("({}.{endian}{width}{adjust:+})", describe_base(base))
        }
    }
}

fn describe_type(value_type: &ValueType) -> String {
    match value_type {
        ValueType::Numeric(numeric) => {
            let sign = if numeric.signed { "" } else { "u" };
            let endian = match numeric.endian {
                Endian::Big => "be",
                Endian::Little => "le",
                Endian::Native => "",
            };
            let mask = numeric
                .mask
                .map(|m| format!("&{m:#x}"))
                .unwrap_or_default();
            format!("{sign}{endian}int{}{mask}", numeric.width)
        }
        ValueType::String => "string".to_string(),
        ValueType::PString => "pstring".to_string(),
        ValueType::Regex => "regex".to_string(),
    }
}

fn print_text(rows: &[RuleRow], rejected: &[MagicParseError]) {
    for row in rows {
        println!(
            "{:>5}  {}{:<12} {:<14} {}{}",
            row.line,
            ">".repeat(row.depth),
            row.offset,
            row.value_type,
            row.mime_type.as_deref().unwrap_or("-"),
            if row.descendants > 0 {
                format!("  (+{} nested)", row.descendants)
            } else {
                String::new()
            }
        );
    }
    if !rejected.is_empty() {
        println!("\nRejected:");
        for error in rejected {
            println!("  {error}");
        }
    }
}

fn print_json(rows: &[RuleRow], rejected: &[MagicParseError]) -> anyhow::Result<()> {
    let rules: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| {
            serde_json::json!({
                "line": row.line,
                "depth": row.depth,
                "offset": row.offset,
                "type": row.value_type,
                "mime_type": row.mime_type,
                "nested": row.descendants,
            })
        })
        .collect();
    let rejected: Vec<String> = rejected.iter().map(ToString::to_string).collect();
    let output = serde_json::json!({
        "rules": rules,
        "rejected": rejected,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv(rows: &[RuleRow]) {
    println!("line\tdepth\toffset\ttype\tmime_type\tnested");
    for row in rows {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            row.line,
            row.depth,
            row.offset,
            row.value_type,
            row.mime_type.as_deref().unwrap_or(""),
            row.descendants
        );
    }
}
