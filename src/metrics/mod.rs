//! Complexity metrics provider.
//!
//! The static extractor hands a line-normalized function body to a
//! [`ComplexityProvider`] and derives the maintainability index from what
//! comes back. The default provider measures the snippet with tree-sitter.

pub mod halstead;

use std::path::Path;

use halstead::TokenCollector;
use tree_sitter::Node;

use crate::core::{Language, Result};
use crate::parser::{queries, Parser};

/// Raw metrics a provider reports for a function body.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsBundle {
    pub halstead_volume: f64,
    pub cyclomatic_complexity: f64,
    pub logical_lines: u32,
    /// Comment lines as a percentage of non-blank lines, 0-100.
    pub comment_percent: f64,
}

/// Computes code-volume and complexity metrics from normalized source text.
pub trait ComplexityProvider: Send + Sync {
    fn measure(&self, source: &str, language: Language) -> Result<MetricsBundle>;
}

/// Default provider backed by a tree-sitter parse of the snippet.
///
/// Body snippets start at their first statement and may not be complete
/// compilation units in every language; tree-sitter's error recovery still
/// yields the token stream and decision nodes the metrics need.
pub struct TreeSitterProvider {
    parser: Parser,
}

impl Default for TreeSitterProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeSitterProvider {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }
}

impl ComplexityProvider for TreeSitterProvider {
    fn measure(&self, source: &str, language: Language) -> Result<MetricsBundle> {
        let parsed = self
            .parser
            .parse(source.as_bytes(), language, Path::new("<snippet>"))?;
        let root = parsed.root_node();

        let mut collector = TokenCollector::new(language);
        collector.collect(root, &parsed.source);
        let volume = collector.metrics().volume;

        let cyclomatic = 1 + count_decision_points(&root, language);
        let (logical_lines, comment_percent) = line_counts(source, language);

        Ok(MetricsBundle {
            halstead_volume: volume,
            cyclomatic_complexity: f64::from(cyclomatic),
            logical_lines,
            comment_percent,
        })
    }
}

/// Count decision points in a subtree: branching node kinds plus the
/// short-circuit operators.
pub fn count_decision_points(node: &Node<'_>, lang: Language) -> u32 {
    let decision_types = queries::decision_node_types(lang);
    let mut count = 0;

    fn visit(node: Node<'_>, decision_types: &[&str], count: &mut u32) {
        let kind = node.kind();
        if decision_types.contains(&kind) || kind == "&&" || kind == "||" {
            *count += 1;
        }
        for child in node.children(&mut node.walk()) {
            visit(child, decision_types, count);
        }
    }

    visit(*node, decision_types, &mut count);
    count
}

/// Logical line count and comment percentage over the snippet text.
fn line_counts(source: &str, lang: Language) -> (u32, f64) {
    let mut logical = 0u32;
    let mut comments = 0u32;
    let mut nonblank = 0u32;

    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        nonblank += 1;
        if is_comment_line(trimmed, lang) {
            comments += 1;
        } else {
            logical += 1;
        }
    }

    let percent = if nonblank > 0 {
        100.0 * f64::from(comments) / f64::from(nonblank)
    } else {
        0.0
    };
    (logical, percent)
}

/// Check if a line is a comment (simple heuristic).
fn is_comment_line(line: &str, lang: Language) -> bool {
    match lang {
        Language::Python => line.starts_with('#'),
        Language::Rust
        | Language::Go
        | Language::JavaScript
        | Language::TypeScript => {
            line.starts_with("//") || line.starts_with("/*") || line.starts_with('*')
        }
    }
}

/// Maintainability index on the 0-100 scale, derived from Halstead volume,
/// cyclomatic complexity, logical lines and comment percentage via the
/// standard formula.
pub fn maintainability_index(
    volume: f64,
    cyclomatic: f64,
    logical_lines: u32,
    comment_percent: f64,
) -> f64 {
    if volume <= 0.0 || logical_lines == 0 {
        return 100.0;
    }
    let comment_weight = (2.46 * comment_percent.to_radians()).sqrt().sin();
    let raw = 171.0 - 5.2 * volume.ln() - 0.23 * cyclomatic
        - 16.2 * f64::from(logical_lines).ln()
        + 50.0 * comment_weight;
    (raw * 100.0 / 171.0).clamp(0.0, 100.0)
}
