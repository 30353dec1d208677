//! Halstead volume from operator and operand token counts.
//!
//! Operators are punctuation tokens and control keywords; operands are
//! identifiers and literals. Volume is `N * log2(n)` over total and
//! distinct token counts.

use std::collections::{HashMap, HashSet};

use tree_sitter::Node;

use crate::core::Language;

/// Base and derived Halstead counts for one snippet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HalsteadMetrics {
    /// Number of distinct operators (n1).
    pub distinct_operators: u32,
    /// Number of distinct operands (n2).
    pub distinct_operands: u32,
    /// Total number of operators (N1).
    pub total_operators: u32,
    /// Total number of operands (N2).
    pub total_operands: u32,
    /// Vocabulary: n = n1 + n2.
    pub vocabulary: u32,
    /// Program length: N = N1 + N2.
    pub length: u32,
    /// Volume: V = N * log2(n).
    pub volume: f64,
}

impl HalsteadMetrics {
    /// Calculate derived metrics from base counts, guarding the log at zero.
    pub fn from_counts(n1: u32, n2: u32, total_n1: u32, total_n2: u32) -> Self {
        let vocabulary = n1 + n2;
        let length = total_n1 + total_n2;

        let volume = if vocabulary > 0 {
            f64::from(length) * f64::from(vocabulary).log2()
        } else {
            0.0
        };

        Self {
            distinct_operators: n1,
            distinct_operands: n2,
            total_operators: total_n1,
            total_operands: total_n2,
            vocabulary,
            length,
            volume,
        }
    }
}

/// Keywords counted as operators, common across the supported languages.
const COMMON_KEYWORD_OPERATORS: &[&str] = &[
    "if", "else", "for", "while", "return", "break", "continue",
];

/// Language-specific keywords counted as operators.
fn keyword_operators(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Python => &[
            "and", "or", "not", "in", "is", "elif", "try", "except", "finally",
            "raise", "with", "as", "from", "import", "def", "class", "yield",
            "pass", "lambda", "assert", "del", "global", "nonlocal", "async",
            "await", "match", "case",
        ],
        Language::Rust => &[
            "loop", "match", "fn", "struct", "enum", "impl", "trait", "pub",
            "mod", "use", "let", "mut", "ref", "const", "static", "unsafe",
            "async", "await", "move", "where", "type", "as", "in", "dyn",
        ],
        Language::Go => &[
            "range", "switch", "case", "default", "select", "func", "go",
            "defer", "chan", "type", "struct", "interface", "package",
            "import", "const", "var", "fallthrough", "goto", "map",
        ],
        Language::JavaScript | Language::TypeScript => &[
            "do", "switch", "case", "default", "try", "catch", "finally",
            "throw", "function", "class", "new", "delete", "void", "in", "of",
            "typeof", "instanceof", "import", "export", "from", "let",
            "const", "var", "async", "await", "yield", "as",
        ],
    }
}

/// Tokens counted as operands even though they are keywords.
fn value_keywords(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Python => &["True", "False", "None"],
        Language::Rust => &["true", "false", "self", "Self"],
        Language::Go => &["true", "false", "nil", "iota"],
        Language::JavaScript | Language::TypeScript => {
            &["true", "false", "null", "undefined", "this", "super"]
        }
    }
}

/// Leaf node kinds that are operands.
const OPERAND_KINDS: &[&str] = &[
    "identifier",
    "field_identifier",
    "property_identifier",
    "type_identifier",
    "shorthand_property_identifier",
    "integer",
    "integer_literal",
    "float",
    "float_literal",
    "number",
    "char_literal",
    "rune_literal",
];

/// Node kinds treated as one whole operand without descending.
const STRING_KINDS: &[&str] = &[
    "string",
    "string_literal",
    "raw_string_literal",
    "interpreted_string_literal",
    "template_string",
    "concatenated_string",
];

/// Token collector that classifies tokens as operators or operands.
pub struct TokenCollector {
    operators: HashMap<String, u32>,
    operands: HashMap<String, u32>,
    keyword_set: HashSet<&'static str>,
    value_set: HashSet<&'static str>,
}

impl TokenCollector {
    /// Create a new collector for a specific language.
    pub fn new(lang: Language) -> Self {
        let mut keyword_set: HashSet<&'static str> =
            COMMON_KEYWORD_OPERATORS.iter().copied().collect();
        keyword_set.extend(keyword_operators(lang).iter().copied());

        Self {
            operators: HashMap::new(),
            operands: HashMap::new(),
            keyword_set,
            value_set: value_keywords(lang).iter().copied().collect(),
        }
    }

    /// Walk a syntax tree and collect every token.
    pub fn collect(&mut self, node: Node<'_>, source: &[u8]) {
        let kind = node.kind();

        if STRING_KINDS.contains(&kind) {
            let text = node.utf8_text(source).unwrap_or("");
            self.add_operand(text);
            return;
        }

        if node.child_count() == 0 {
            let text = node.utf8_text(source).unwrap_or("");
            self.classify(kind, text);
            return;
        }

        for child in node.children(&mut node.walk()) {
            self.collect(child, source);
        }
    }

    fn classify(&mut self, kind: &str, text: &str) {
        if text.trim().is_empty() || kind == "comment" || kind.ends_with("comment") {
            return;
        }

        if self.value_set.contains(text) {
            self.add_operand(text);
        } else if OPERAND_KINDS.contains(&kind) {
            self.add_operand(text);
        } else if self.keyword_set.contains(text) {
            self.add_operator(text);
        } else if !kind.chars().next().is_some_and(|c| c.is_alphanumeric()) {
            // Anonymous punctuation tokens: the kind is the token itself.
            self.add_operator(text);
        }
    }

    fn add_operator(&mut self, text: &str) {
        *self.operators.entry(text.to_string()).or_insert(0) += 1;
    }

    fn add_operand(&mut self, text: &str) {
        *self.operands.entry(text.to_string()).or_insert(0) += 1;
    }

    /// Compute final metrics from the collected counts.
    pub fn metrics(&self) -> HalsteadMetrics {
        let n1 = self.operators.len() as u32;
        let n2 = self.operands.len() as u32;
        let total_n1: u32 = self.operators.values().sum();
        let total_n2: u32 = self.operands.values().sum();
        HalsteadMetrics::from_counts(n1, n2, total_n1, total_n2)
    }
}
