//! Syntax tree → language-neutral class/method/call records.
//!
//! Each language supplies a [`SyntaxShape`] (which node kinds are classes,
//! bodies, methods and invocations) plus a callee-name rule; the walk itself
//! is shared and lives in the trait's provided methods.

use std::path::Path;

use tree_sitter::{Node, Tree};

use crate::error::{CallGraphError, Result};
use crate::indexer::csharp::CSharpExtractor;
use crate::indexer::java::JavaExtractor;
use crate::indexer::parser::CodeParser;
use crate::types::{ClassRecord, Language, MethodRecord, Visibility};

/// Tokens that can precede a class name and must never be taken for one.
const NON_NAME_TOKENS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "abstract", "sealed", "partial",
    "final", "readonly", "unsafe", "new", "class", "strictfp", "file",
];

/// Node kinds that make up one language's class/method structure.
#[derive(Debug)]
pub struct SyntaxShape {
    pub class_kinds: &'static [&'static str],
    pub body_kinds: &'static [&'static str],
    pub method_kinds: &'static [&'static str],
    pub constructor_kinds: &'static [&'static str],
    pub modifier_kinds: &'static [&'static str],
    pub invocation_kinds: &'static [&'static str],
}

/// Text covered by `node`.
pub fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// `true` for a plain identifier (letters, digits, `_`, not starting with a digit).
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Trailing identifier of a callee expression: `a.b.Run<T>` → `Run`.
pub fn trailing_identifier(text: &str) -> Option<String> {
    let without_generics = match text.find('<') {
        Some(i) => &text[..i],
        None => text,
    };
    let last = without_generics.rsplit(['.', ':']).next()?.trim();
    let last = last.trim_start_matches('@');
    is_identifier(last).then(|| last.to_string())
}

/// Per-language extraction.
pub trait StructureExtractor: Send + Sync {
    fn language(&self) -> Language;

    fn shape(&self) -> &'static SyntaxShape;

    /// Called method name for an invocation node, receiver stripped.
    fn call_name(&self, invocation: Node<'_>, source: &str) -> Option<String>;

    /// Every class in the tree, nested classes included as separate records.
    fn extract(&self, tree: &Tree, source: &str) -> Vec<ClassRecord> {
        let mut out = Vec::new();
        self.collect_classes(tree.root_node(), source, &mut out);
        out
    }

    fn collect_classes(&self, node: Node<'_>, source: &str, out: &mut Vec<ClassRecord>) {
        if self.shape().class_kinds.contains(&node.kind()) {
            if let Some(class) = self.class_record(node, source) {
                out.push(class);
            }
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.collect_classes(child, source, out);
        }
    }

    fn class_record(&self, node: Node<'_>, source: &str) -> Option<ClassRecord> {
        let name = match node.child_by_field_name("name") {
            Some(n) => node_text(n, source).to_string(),
            None => fallback_class_name(node, source)?,
        };
        let visibility = self
            .access_modifier(node, source)
            .unwrap_or(Visibility::CLASS_DEFAULT);

        let shape = self.shape();
        let mut methods: Vec<MethodRecord> = Vec::new();
        let body = node
            .child_by_field_name("body")
            .filter(|b| shape.body_kinds.contains(&b.kind()));
        if let Some(body) = body {
            let mut cursor = body.walk();
            for member in body.named_children(&mut cursor) {
                let kind = member.kind();
                if shape.method_kinds.contains(&kind) || shape.constructor_kinds.contains(&kind) {
                    if let Some(method) = self.method_record(member, source) {
                        methods.push(method);
                    }
                }
            }
        }

        Some(ClassRecord {
            name,
            visibility,
            methods,
        })
    }

    fn method_record(&self, node: Node<'_>, source: &str) -> Option<MethodRecord> {
        let name = node_text(node.child_by_field_name("name")?, source).to_string();
        if !is_identifier(&name) {
            return None;
        }
        let visibility = self
            .access_modifier(node, source)
            .unwrap_or(Visibility::METHOD_DEFAULT);

        let mut raw_calls = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            self.collect_calls(body, source, &mut raw_calls);
        }

        Some(MethodRecord {
            name,
            visibility,
            raw_calls,
            definition: Some(node_text(node, source).to_string()),
        })
    }

    /// Pre-order walk of `node`, recording each new call name.
    fn collect_calls(&self, node: Node<'_>, source: &str, out: &mut Vec<String>) {
        if self.shape().invocation_kinds.contains(&node.kind()) {
            if let Some(name) = self.call_name(node, source) {
                if !out.contains(&name) {
                    out.push(name);
                }
            }
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.collect_calls(child, source, out);
        }
    }

    /// First access-modifier token on `node`, if any.
    fn access_modifier(&self, node: Node<'_>, source: &str) -> Option<Visibility> {
        let kinds = self.shape().modifier_kinds;
        let mut cursor = node.walk();
        let found = node
            .children(&mut cursor)
            .filter(|c| kinds.contains(&c.kind()))
            .flat_map(|c| node_text(c, source).split_whitespace())
            .find_map(Visibility::from_modifier);
        found
    }
}

/// First identifier child that starts with an uppercase letter and is not a
/// modifier or type keyword.
fn fallback_class_name(node: Node<'_>, source: &str) -> Option<String> {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .filter(|c| c.kind() == "identifier")
        .map(|c| node_text(c, source))
        .find(|text| {
            text.chars().next().is_some_and(char::is_uppercase)
                && !NON_NAME_TOKENS.contains(&text.to_lowercase().as_str())
        })
        .map(str::to_string);
    found
}

/// The extractor for `language`.
pub fn extractor_for(language: Language) -> &'static dyn StructureExtractor {
    match language {
        Language::CSharp => &CSharpExtractor,
        Language::Java => &JavaExtractor,
    }
}

/// Read, parse and extract one file. The language comes from the extension.
pub fn extract_file(path: &Path) -> Result<(Language, Vec<ClassRecord>)> {
    let language = CodeParser::detect_language(path)
        .ok_or_else(|| CallGraphError::parse(path, "unsupported file extension"))?;
    let source = CodeParser::read_source(path)?;
    let classes = extract_source(path, &source, language)?;
    Ok((language, classes))
}

/// Parse and extract in-memory source text.
pub fn extract_source(path: &Path, source: &str, language: Language) -> Result<Vec<ClassRecord>> {
    let tree = CodeParser::new().parse(path, source, language)?;
    if tree.root_node().has_error() {
        tracing::debug!(path = %path.display(), "syntax errors; extracting what parsed");
    }
    Ok(extractor_for(language).extract(&tree, source))
}
