//! Static feature extraction for test functions.
//!
//! Turns one test callable into a structural/complexity record: nesting
//! depth, assertion count, external module references, and the complexity
//! metrics reported by the provider. Retrieval or parse failures are not
//! errors; the test is silently excluded from the static dataset and still
//! executes normally.

use std::collections::BTreeSet;
use std::fs;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::config::StaticsConfig;
use crate::core::{Language, TestItem};
use crate::metrics::{maintainability_index, ComplexityProvider, TreeSitterProvider};
use crate::parser::{self, queries, Parser};
use crate::resolve::{InstallRootResolver, ModuleResolver, ModuleScope};

/// Leading whitespace of a line, captured only when the line has content.
static INDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([ \t]*)[^ \t\n]").expect("indent regex is valid"));

/// Structural and complexity features of one test callable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticRecord {
    pub ast_depth: u32,
    pub assert_count: u32,
    pub external_module_count: u32,
    pub halstead_volume: f64,
    pub cyclomatic_complexity: f64,
    pub logical_lines: u32,
    pub maintainability_index: f64,
}

/// Static feature extractor.
pub struct Extractor {
    parser: Parser,
    provider: Box<dyn ComplexityProvider>,
    resolver: Box<dyn ModuleResolver>,
    framework_exclude: Vec<String>,
}

impl Extractor {
    /// Create an extractor from the static-analysis configuration.
    pub fn new(config: &StaticsConfig) -> Self {
        Self {
            parser: Parser::new(),
            provider: Box::new(TreeSitterProvider::new()),
            resolver: Box::new(InstallRootResolver::new(&config.library_root)),
            framework_exclude: config.framework_exclude.clone(),
        }
    }

    /// Replace the module resolver.
    pub fn with_resolver(mut self, resolver: Box<dyn ModuleResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the complexity provider.
    pub fn with_provider(mut self, provider: Box<dyn ComplexityProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Extract the static record for one test item.
    ///
    /// Returns `None` when the source is unavailable, the snippet is
    /// unparsable, or the item does not point at a function definition.
    pub fn extract(&self, item: &TestItem) -> Option<StaticRecord> {
        let lang = Language::detect(&item.file)?;
        let content = fs::read_to_string(&item.file).ok()?;
        let parsed = self
            .parser
            .parse(content.as_bytes(), lang, &item.file)
            .ok()?;
        let root = parsed.root_node();
        let func = parser::function_at_line(&root, lang, item.line)?;

        // The snippet is the function's own lines, re-normalized so it
        // parses at top level regardless of its original nesting.
        let lines: Vec<&str> = content.lines().collect();
        let start = func.start_position().row;
        let end = func.end_position().row.min(lines.len().saturating_sub(1));
        let snippet = normalize_indent(&lines[start..=end]);

        let reparsed = self
            .parser
            .parse(snippet.as_bytes(), lang, &item.file)
            .ok()?;
        let snippet_root = reparsed.root_node();
        if snippet_root.has_error() {
            return None;
        }
        let func_node = top_level_function(&snippet_root, lang)?;
        let body = func_node.child_by_field_name("body")?;

        let scope = import_scope(&root, content.as_bytes(), lang);
        let locals = local_bindings(&func_node, &reparsed.source, lang);

        let ast_depth = nesting_depth(&body, lang);
        let assert_count = count_assertions(&func_node, &reparsed.source, lang);
        let external_module_count =
            self.external_modules(&func_node, &reparsed.source, lang, &scope, &locals);

        // Complexity runs over the body text from its first statement
        // onward, re-normalized to that statement's indentation.
        let snippet_lines: Vec<&str> = snippet.lines().collect();
        let body_src = normalize_indent(&snippet_lines[body.start_position().row..]);
        let m = self.provider.measure(&body_src, lang).ok()?;

        Some(StaticRecord {
            ast_depth,
            assert_count,
            external_module_count,
            halstead_volume: m.halstead_volume,
            cyclomatic_complexity: m.cyclomatic_complexity,
            logical_lines: m.logical_lines,
            maintainability_index: maintainability_index(
                m.halstead_volume,
                m.cyclomatic_complexity,
                m.logical_lines,
                m.comment_percent,
            ),
        })
    }

    /// Distinct library-installed modules the function references, from
    /// imports inside the function and bare names resolved through the
    /// enclosing file's import bindings.
    fn external_modules(
        &self,
        func: &Node<'_>,
        source: &[u8],
        lang: Language,
        scope: &ModuleScope,
        locals: &BTreeSet<String>,
    ) -> u32 {
        let mut modules: BTreeSet<String> = BTreeSet::new();

        let mut imported = Vec::new();
        collect_import_modules(func, source, lang, &mut imported);
        for module in imported {
            let top = module.split('.').next().unwrap_or(&module).to_string();
            if self.resolver.is_external(&top) {
                modules.insert(top);
            }
        }

        collect_referenced_modules(func, source, scope, locals, self.resolver.as_ref(), &mut modules);

        modules.retain(|m| !self.framework_exclude.iter().any(|f| m.contains(f.as_str())));
        modules.len() as u32
    }
}

/// Strip the literal leading-whitespace prefix of the first line from every
/// line that carries it. Tabs and spaces are matched literally, never by
/// tab-width expansion. A whitespace-only first line leaves the text as is.
pub fn normalize_indent(lines: &[&str]) -> String {
    let mut text = String::new();

    let prefix = lines
        .first()
        .and_then(|first| INDENT_RE.captures(first))
        .map(|c| c.get(1).map_or("", |m| m.as_str()).to_string())
        .unwrap_or_default();

    for line in lines {
        if prefix.is_empty() {
            text.push_str(line);
        } else {
            text.push_str(line.strip_prefix(prefix.as_str()).unwrap_or(line));
        }
        text.push('\n');
    }
    text
}

/// Nesting depth over statement nodes: a statement contributes
/// 1 + the maximum depth of its children; every other node passes its
/// children's maximum through. The depth of a function body is therefore
/// the maximum over its top-level statements.
pub fn nesting_depth(node: &Node<'_>, lang: Language) -> u32 {
    let statements = queries::statement_node_types(lang);

    fn depth(node: Node<'_>, statements: &[&str]) -> u32 {
        let mut max_child = 0;
        for child in node.children(&mut node.walk()) {
            max_child = max_child.max(depth(child, statements));
        }
        if statements.contains(&node.kind()) {
            1 + max_child
        } else {
            max_child
        }
    }

    depth(*node, statements)
}

/// Count assertion constructs anywhere in the subtree.
pub fn count_assertions(node: &Node<'_>, source: &[u8], lang: Language) -> u32 {
    fn visit(node: Node<'_>, source: &[u8], lang: Language, count: &mut u32) {
        if is_assertion(&node, source, lang) {
            *count += 1;
        }
        for child in node.children(&mut node.walk()) {
            visit(child, source, lang, count);
        }
    }

    let mut count = 0;
    visit(*node, source, lang, &mut count);
    count
}

fn is_assertion(node: &Node<'_>, source: &[u8], lang: Language) -> bool {
    match lang {
        Language::Python => node.kind() == "assert_statement",
        Language::Rust => {
            node.kind() == "macro_invocation"
                && node
                    .child_by_field_name("macro")
                    .and_then(|m| m.utf8_text(source).ok())
                    .is_some_and(|name| {
                        let name = name.rsplit("::").next().unwrap_or(name);
                        name.starts_with("assert") || name.starts_with("debug_assert")
                    })
        }
        Language::Go => {
            node.kind() == "call_expression"
                && node
                    .child_by_field_name("function")
                    .and_then(|f| f.utf8_text(source).ok())
                    .is_some_and(|name| {
                        name.starts_with("assert.")
                            || name.starts_with("require.")
                            || name.starts_with("t.Error")
                            || name.starts_with("t.Fatal")
                    })
        }
        Language::JavaScript | Language::TypeScript => {
            node.kind() == "call_expression"
                && node
                    .child_by_field_name("function")
                    .and_then(|f| f.utf8_text(source).ok())
                    .is_some_and(|name| {
                        name == "expect" || name == "assert" || name.starts_with("assert.")
                    })
        }
    }
}

/// Name bindings introduced by the file's import statements.
pub fn import_scope(root: &Node<'_>, source: &[u8], lang: Language) -> ModuleScope {
    let mut scope = ModuleScope::new();
    if lang != Language::Python {
        return scope;
    }

    fn visit(node: Node<'_>, source: &[u8], scope: &mut ModuleScope) {
        match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    match child.kind() {
                        "dotted_name" => {
                            if let Ok(name) = child.utf8_text(source) {
                                let top = name.split('.').next().unwrap_or(name);
                                scope.bind(top, name);
                            }
                        }
                        "aliased_import" => {
                            let module = child
                                .child_by_field_name("name")
                                .and_then(|n| n.utf8_text(source).ok());
                            let alias = child
                                .child_by_field_name("alias")
                                .and_then(|n| n.utf8_text(source).ok());
                            if let (Some(module), Some(alias)) = (module, alias) {
                                scope.bind(alias, module);
                            }
                        }
                        _ => {}
                    }
                }
            }
            "import_from_statement" => {
                let module = node
                    .child_by_field_name("module_name")
                    .and_then(|n| n.utf8_text(source).ok());
                // Relative imports stay inside the project.
                let Some(module) = module.filter(|m| !m.starts_with('.')) else {
                    return;
                };
                let module_id = node.child_by_field_name("module_name").map(|n| n.id());
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if Some(child.id()) == module_id {
                        continue;
                    }
                    match child.kind() {
                        "dotted_name" => {
                            if let Ok(name) = child.utf8_text(source) {
                                scope.bind(name, module);
                            }
                        }
                        "aliased_import" => {
                            if let Some(alias) = child
                                .child_by_field_name("alias")
                                .and_then(|n| n.utf8_text(source).ok())
                            {
                                scope.bind(alias, module);
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    visit(child, source, scope);
                }
            }
        }
    }

    visit(*root, source, &mut scope);
    scope
}

/// Module names imported by statements inside the subtree.
fn collect_import_modules(node: &Node<'_>, source: &[u8], lang: Language, out: &mut Vec<String>) {
    let import_types = queries::import_node_types(lang);

    fn visit(
        node: Node<'_>,
        source: &[u8],
        lang: Language,
        import_types: &[&str],
        out: &mut Vec<String>,
    ) {
        if import_types.contains(&node.kind()) {
            if let Some(module) = import_module_name(&node, source, lang) {
                out.push(module);
            }
        }
        for child in node.children(&mut node.walk()) {
            visit(child, source, lang, import_types, out);
        }
    }

    visit(*node, source, lang, import_types, out);
}

/// The module a single import node brings in.
fn import_module_name(node: &Node<'_>, source: &[u8], lang: Language) -> Option<String> {
    let text = node.utf8_text(source).ok()?;
    match lang {
        Language::Python => match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                let first = node.named_children(&mut cursor).next()?;
                let name = match first.kind() {
                    "aliased_import" => first
                        .child_by_field_name("name")?
                        .utf8_text(source)
                        .ok()?,
                    _ => first.utf8_text(source).ok()?,
                };
                Some(name.to_string())
            }
            "import_from_statement" => {
                let module = node
                    .child_by_field_name("module_name")?
                    .utf8_text(source)
                    .ok()?;
                (!module.starts_with('.')).then(|| module.to_string())
            }
            _ => None,
        },
        Language::Rust => {
            let path = text.trim_start_matches("use ").trim_end_matches(';').trim();
            let first = path.split("::").next()?.trim();
            (!matches!(first, "crate" | "super" | "self")).then(|| first.to_string())
        }
        Language::Go | Language::JavaScript | Language::TypeScript => {
            let quoted = text.split('"').nth(1)?;
            (!quoted.starts_with('.')).then(|| {
                quoted
                    .split('/')
                    .next()
                    .unwrap_or(quoted)
                    .to_string()
            })
        }
    }
}

/// Names bound locally in the function: parameters plus assignment and
/// loop targets. Bare references to these never resolve to modules.
pub fn local_bindings(func: &Node<'_>, source: &[u8], lang: Language) -> BTreeSet<String> {
    let mut locals = BTreeSet::new();

    fn identifiers_into(node: Node<'_>, source: &[u8], out: &mut BTreeSet<String>) {
        if node.kind() == "identifier" {
            if let Ok(name) = node.utf8_text(source) {
                out.insert(name.to_string());
            }
        }
        for child in node.children(&mut node.walk()) {
            identifiers_into(child, source, out);
        }
    }

    fn visit(node: Node<'_>, source: &[u8], lang: Language, locals: &mut BTreeSet<String>) {
        match node.kind() {
            "parameters" | "parameter_list" | "formal_parameters" => {
                identifiers_into(node, source, locals);
            }
            "assignment" | "augmented_assignment" if lang == Language::Python => {
                if let Some(left) = node.child_by_field_name("left") {
                    identifiers_into(left, source, locals);
                }
            }
            "for_statement" if lang == Language::Python => {
                if let Some(left) = node.child_by_field_name("left") {
                    identifiers_into(left, source, locals);
                }
            }
            "as_pattern" if lang == Language::Python => {
                if let Some(alias) = node.child_by_field_name("alias") {
                    identifiers_into(alias, source, locals);
                }
            }
            "let_declaration" if lang == Language::Rust => {
                if let Some(pattern) = node.child_by_field_name("pattern") {
                    identifiers_into(pattern, source, locals);
                }
            }
            _ => {}
        }
        for child in node.children(&mut node.walk()) {
            visit(child, source, lang, locals);
        }
    }

    visit(*func, source, lang, &mut locals);
    locals
}

/// Bare name references resolved through the file's import bindings,
/// filtered to library-installed modules.
fn collect_referenced_modules(
    func: &Node<'_>,
    source: &[u8],
    scope: &ModuleScope,
    locals: &BTreeSet<String>,
    resolver: &dyn ModuleResolver,
    out: &mut BTreeSet<String>,
) {
    fn visit(
        node: Node<'_>,
        source: &[u8],
        scope: &ModuleScope,
        locals: &BTreeSet<String>,
        resolver: &dyn ModuleResolver,
        out: &mut BTreeSet<String>,
    ) {
        if node.kind() == "identifier" {
            if let Ok(name) = node.utf8_text(source) {
                if !locals.contains(name) {
                    if let Some(module) = scope.module_for(name) {
                        if resolver.is_external(module) {
                            out.insert(module.to_string());
                        }
                    }
                }
            }
        }
        for child in node.children(&mut node.walk()) {
            visit(child, source, scope, locals, resolver, out);
        }
    }

    visit(*func, source, scope, locals, resolver, out);
}

/// The single top-level function definition of a normalized snippet.
fn top_level_function<'a>(root: &Node<'a>, lang: Language) -> Option<Node<'a>> {
    let types = queries::function_node_types(lang);
    let mut cursor = root.walk();
    let first = root
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment")?;
    types.contains(&first.kind()).then_some(first)
}
