//! Compiler from magic rule text into a rule forest.
//!
//! A group starts at each line without a leading `>` and runs until the next such
//! line. Continuation lines (`>`, `>>`, ...) become children of the closest
//! preceding line one level shallower. Groups containing any malformed line are
//! rejected as a whole; the remaining groups still load.

use std::time::Instant;

use thiserror::Error;
use tracing::{debug, warn};

use crate::core::types::MimeType;
use crate::parsing::entry::{parse_entry, MagicEntry};

/// Deepest continuation level accepted
pub const MAX_RULE_DEPTH: usize = 32;

#[derive(Error, Debug)]
pub enum MagicParseError {
    #[error("Invalid magic entry at line {line}: {reason}")]
    InvalidMagicEntry { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Index of a node in [`MagicRuleSet::nodes`]
pub type RuleId = usize;

#[derive(Debug, Clone)]
pub struct MagicRuleNode {
    /// 1-based line number in the rule source
    pub line: usize,
    pub entry: MagicEntry,
    pub children: Vec<RuleId>,
}

impl MagicRuleNode {
    pub fn mime_type(&self) -> Option<&MimeType> {
        self.entry.mime_type.as_ref()
    }
}

/// Arena of compiled rules. `roots` keeps source order.
#[derive(Debug, Clone, Default)]
pub struct MagicRuleSet {
    nodes: Vec<MagicRuleNode>,
    roots: Vec<RuleId>,
}

/// Result of compiling one rule source
#[derive(Debug, Default)]
pub struct CompileReport {
    pub rules: MagicRuleSet,
    pub rejected: Vec<MagicParseError>,
}

impl MagicRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile rule text, logging and skipping malformed groups
    pub fn parse(source: &str, text: &str) -> Self {
        compile(source, text).rules
    }

    pub fn node(&self, id: RuleId) -> &MagicRuleNode {
        &self.nodes[id]
    }

    pub fn roots(&self) -> &[RuleId] {
        &self.roots
    }

    pub fn root_nodes(&self) -> impl Iterator<Item = &MagicRuleNode> {
        self.roots.iter().map(|&id| &self.nodes[id])
    }

    /// Number of top-level rules
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Append another rule set after this one; existing rules keep precedence
    pub fn append(&mut self, other: MagicRuleSet) {
        let shift = self.nodes.len();
        self.nodes.extend(other.nodes.into_iter().map(|mut node| {
            for child in &mut node.children {
                *child += shift;
            }
            node
        }));
        self.roots.extend(other.roots.into_iter().map(|id| id + shift));
    }

    /// Add one validated group; the first entry is the root
    fn push_group(&mut self, group: Vec<(usize, MagicEntry)>) {
        let mut stack: Vec<RuleId> = Vec::with_capacity(group.len());
        for (line, entry) in group {
            let depth = entry.depth;
            let id = self.nodes.len();
            self.nodes.push(MagicRuleNode {
                line,
                entry,
                children: Vec::new(),
            });
            stack.truncate(depth);
            match stack.last() {
                Some(&parent) => self.nodes[parent].children.push(id),
                None => self.roots.push(id),
            }
            stack.push(id);
        }
    }
}

/// Compile rule text, returning the rules together with every rejected group
pub fn compile(source: &str, text: &str) -> CompileReport {
    let start = Instant::now();
    let mut report = CompileReport::default();
    let mut group: Vec<(usize, &str)> = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim_end();
        if line.trim_start().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        if !line.starts_with('>') && !group.is_empty() {
            finish_group(source, &mut group, &mut report);
        }
        group.push((index + 1, line));
    }
    finish_group(source, &mut group, &mut report);

    debug!(
        source,
        accepted = report.rules.len(),
        rejected = report.rejected.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "Compiled magic rules"
    );
    report
}

fn finish_group(source: &str, group: &mut Vec<(usize, &str)>, report: &mut CompileReport) {
    if group.is_empty() {
        return;
    }
    match build_group(group) {
        Ok(entries) => report.rules.push_group(entries),
        Err(e) => {
            warn!(source, error = %e, "Skipping magic rule group");
            report.rejected.push(e);
        }
    }
    group.clear();
}

fn build_group(lines: &[(usize, &str)]) -> Result<Vec<(usize, MagicEntry)>, MagicParseError> {
    let mut entries = Vec::with_capacity(lines.len());
    let mut previous_depth: Option<usize> = None;

    for &(line, text) in lines {
        let invalid = |reason: String| MagicParseError::InvalidMagicEntry { line, reason };
        let entry = parse_entry(text).map_err(invalid)?;

        if entry.depth > MAX_RULE_DEPTH {
            return Err(invalid(format!(
                "nesting depth {} exceeds limit of {MAX_RULE_DEPTH}",
                entry.depth
            )));
        }
        match previous_depth {
            None if entry.depth != 0 => {
                return Err(invalid("continuation line without a parent".to_string()));
            }
            Some(previous) if entry.depth > previous + 1 => {
                return Err(invalid(format!(
                    "nesting jumps from level {previous} to {}",
                    entry.depth
                )));
            }
            _ => {}
        }
        previous_depth = Some(entry.depth);
        entries.push((line, entry));
    }
    Ok(entries)
}
