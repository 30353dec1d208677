//! Tree-sitter based multi-language parser.

pub mod queries;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tree_sitter::{Language as TsLanguage, Node, Parser as TsParser, Tree};

use crate::core::{Error, Language, Result};

/// Thread-safe parser pool for multi-language parsing.
pub struct Parser {
    /// Cached parsers per language.
    parsers: Mutex<HashMap<Language, TsParser>>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self {
            parsers: Mutex::new(HashMap::new()),
        }
    }

    /// Parse content with explicit language.
    pub fn parse(&self, content: &[u8], lang: Language, path: &Path) -> Result<ParseResult> {
        let ts_lang = get_tree_sitter_language(lang);

        let tree = {
            let mut parsers = self.parsers.lock();
            let parser = parsers.entry(lang).or_insert_with(|| {
                let mut p = TsParser::new();
                p.set_language(&ts_lang).expect("Language should be valid");
                p
            });

            parser.parse(content, None).ok_or_else(|| Error::Parse {
                path: path.to_path_buf(),
                message: "Failed to parse file".to_string(),
            })?
        };

        Ok(ParseResult {
            tree: Arc::new(tree),
            source: content.to_vec(),
            language: lang,
            path: path.to_path_buf(),
        })
    }
}

/// Result of parsing a source file or snippet.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// The parsed syntax tree.
    pub tree: Arc<Tree>,
    /// Original source content.
    pub source: Vec<u8>,
    /// Language the content was parsed as.
    pub language: Language,
    /// File path.
    pub path: std::path::PathBuf,
}

impl ParseResult {
    /// Get the root node of the tree.
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Get text for a node.
    pub fn node_text(&self, node: &Node<'_>) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }
}

/// Get tree-sitter language for a Language enum value.
pub fn get_tree_sitter_language(lang: Language) -> TsLanguage {
    match lang {
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::Rust => tree_sitter_rust::LANGUAGE.into(),
        Language::Go => tree_sitter_go::LANGUAGE.into(),
        Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
    }
}

/// Find the innermost function definition whose span covers `line`
/// (1-indexed).
pub fn function_at_line<'a>(root: &Node<'a>, lang: Language, line: u32) -> Option<Node<'a>> {
    let row = line.saturating_sub(1) as usize;
    let function_types = queries::function_node_types(lang);

    fn visit<'a>(
        node: Node<'a>,
        row: usize,
        function_types: &[&str],
        best: &mut Option<Node<'a>>,
    ) {
        if node.start_position().row > row || node.end_position().row < row {
            return;
        }
        if function_types.contains(&node.kind()) {
            // Innermost wins: deeper matches overwrite shallower ones.
            *best = Some(node);
        }
        for child in node.children(&mut node.walk()) {
            visit(child, row, function_types, best);
        }
    }

    let mut best = None;
    visit(*root, row, function_types, &mut best);
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_python() {
        let parser = Parser::new();
        let content = b"def test_add():\n    assert 1 + 1 == 2\n";
        let result = parser
            .parse(content, Language::Python, Path::new("test_add.py"))
            .unwrap();

        assert_eq!(result.language, Language::Python);
        assert!(!result.root_node().has_error());
    }

    #[test]
    fn test_parse_rust() {
        let parser = Parser::new();
        let content = b"fn check() {\n    assert_eq!(2, 1 + 1);\n}\n";
        let result = parser
            .parse(content, Language::Rust, Path::new("check.rs"))
            .unwrap();

        assert!(!result.root_node().has_error());
    }

    #[test]
    fn test_function_at_line_finds_enclosing_def() {
        let parser = Parser::new();
        let content = b"x = 1\n\ndef test_one():\n    assert x == 1\n\ndef test_two():\n    assert x != 2\n";
        let result = parser
            .parse(content, Language::Python, Path::new("test_mod.py"))
            .unwrap();

        let root = result.root_node();
        let func = function_at_line(&root, Language::Python, 3).unwrap();
        assert_eq!(func.kind(), "function_definition");
        assert_eq!(func.start_position().row, 2);

        let func = function_at_line(&root, Language::Python, 7).unwrap();
        assert_eq!(func.start_position().row, 5);
    }

    #[test]
    fn test_function_at_line_innermost_wins() {
        let parser = Parser::new();
        let content = b"def outer():\n    def inner():\n        pass\n    inner()\n";
        let result = parser
            .parse(content, Language::Python, Path::new("nested.py"))
            .unwrap();

        let root = result.root_node();
        let func = function_at_line(&root, Language::Python, 3).unwrap();
        // Line 3 is inside both; the inner definition is the match.
        assert_eq!(func.start_position().row, 1);
    }

    #[test]
    fn test_function_at_line_misses_module_level_code() {
        let parser = Parser::new();
        let content = b"x = 1\n\ndef test_one():\n    pass\n";
        let result = parser
            .parse(content, Language::Python, Path::new("test_mod.py"))
            .unwrap();

        let root = result.root_node();
        assert!(function_at_line(&root, Language::Python, 1).is_none());
    }
}
