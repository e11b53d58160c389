//! Core domain types for codepecker.
//!
//! Two families live here: the language-neutral *records* produced by the
//! structure extractors and consumed by ingest, and the persisted *graph*
//! types (class/method nodes, call edges) returned by the stores.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CallGraphError, Result};

/// Row identifier of a node inside a graph backend.
pub type NodeId = i64;

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// Source languages with a structure extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    CSharp,
    Java,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::CSharp, Language::Java];

    /// Map a file extension (including the dot) to a language.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            ".cs" | ".csx" => Some(Self::CSharp),
            ".java" => Some(Self::Java),
            _ => None,
        }
    }

    /// File extensions (with the dot) handled by this language's extractor.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::CSharp => &[".cs", ".csx"],
            Self::Java => &[".java"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CSharp => "csharp",
            Self::Java => "java",
        }
    }

    /// Parse from a string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "csharp" | "c#" | "c_sharp" | "cs" => Some(Self::CSharp),
            "java" => Some(Self::Java),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// Access level of a class or method.
///
/// Classes default to [`Visibility::Private`]; methods default to
/// [`Visibility::Public`] because a method without a modifier is assumed to
/// be externally callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Visibility {
    Public,
    Private,
    Protected,
    Internal,
}

impl Visibility {
    pub const CLASS_DEFAULT: Visibility = Visibility::Private;
    pub const METHOD_DEFAULT: Visibility = Visibility::Public;

    /// Recognise an access-modifier token, e.g. `public`.
    pub fn from_modifier(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            "protected" => Some(Self::Protected),
            "internal" => Some(Self::Internal),
            _ => None,
        }
    }

    /// Canonical title-case form stored in the graph.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::Private => "Private",
            Self::Protected => "Protected",
            Self::Internal => "Internal",
        }
    }
}

impl TryFrom<String> for Visibility {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::from_modifier(&value).ok_or_else(|| format!("unknown visibility: {value:?}"))
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn class_default_visibility() -> Visibility {
    Visibility::CLASS_DEFAULT
}

fn method_default_visibility() -> Visibility {
    Visibility::METHOD_DEFAULT
}

// ---------------------------------------------------------------------------
// Extraction records
// ---------------------------------------------------------------------------

/// One method as seen by an extractor. Calls are raw, unresolved names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRecord {
    pub name: String,
    #[serde(default = "method_default_visibility")]
    pub visibility: Visibility,
    #[serde(default, alias = "method_calls", alias = "calls")]
    pub raw_calls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

impl MethodRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::METHOD_DEFAULT,
            raw_calls: Vec::new(),
            definition: None,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_calls<I, S>(mut self, calls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.raw_calls = calls.into_iter().map(Into::into).collect();
        self
    }
}

/// One class as seen by an extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub name: String,
    #[serde(default = "class_default_visibility")]
    pub visibility: Visibility,
    #[serde(default)]
    pub methods: Vec<MethodRecord>,
}

impl ClassRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::CLASS_DEFAULT,
            methods: Vec::new(),
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_method(mut self, method: MethodRecord) -> Self {
        self.methods.push(method);
        self
    }
}

/// Ingestion input: language → file path → classes found in that file.
///
/// Ordered maps keep ingestion order (and therefore node ids) deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSet {
    pub languages: BTreeMap<Language, BTreeMap<String, Vec<ClassRecord>>>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the classes extracted from one file.
    pub fn insert(&mut self, language: Language, file_path: impl Into<String>, classes: Vec<ClassRecord>) {
        self.languages
            .entry(language)
            .or_default()
            .insert(file_path.into(), classes);
    }

    /// Iterate `(language, file_path, classes)` in deterministic order.
    pub fn files(&self) -> impl Iterator<Item = (Language, &str, &[ClassRecord])> {
        self.languages.iter().flat_map(|(lang, files)| {
            files
                .iter()
                .map(move |(path, classes)| (*lang, path.as_str(), classes.as_slice()))
        })
    }

    pub fn file_count(&self) -> usize {
        self.languages.values().map(|f| f.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.file_count() == 0
    }

    /// Check the required fields of one file's records.
    pub fn validate_file(file_path: &str, classes: &[ClassRecord]) -> Result<()> {
        let invalid = |reason: String| CallGraphError::InvalidRecord {
            file_path: file_path.to_string(),
            reason,
        };
        if file_path.trim().is_empty() {
            return Err(invalid("empty file path".into()));
        }
        for class in classes {
            if !is_identifier(&class.name) {
                return Err(invalid(format!("bad class name {:?}", class.name)));
            }
            for method in &class.methods {
                if !is_identifier(&method.name) {
                    return Err(invalid(format!(
                        "bad method name {:?} in class {}",
                        method.name, class.name
                    )));
                }
                if let Some(call) = method.raw_calls.iter().find(|c| c.trim().is_empty()) {
                    return Err(invalid(format!(
                        "empty call name {call:?} in {}.{}",
                        class.name, method.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Non-empty and free of whitespace.
fn is_identifier(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(char::is_whitespace)
}

// ---------------------------------------------------------------------------
// Graph types
// ---------------------------------------------------------------------------

/// Persisted class node. Identity is `(name, file_path)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassNode {
    pub id: NodeId,
    pub name: String,
    pub file_path: String,
    pub visibility: Visibility,
}

/// Persisted method node. Identity is `(name, class_name)`; overloads share a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodNode {
    pub id: NodeId,
    pub name: String,
    pub class_name: String,
    pub visibility: Visibility,
    pub raw_calls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

impl MethodNode {
    /// `Class.Method` display form.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.class_name, self.name)
    }
}

/// How a CALLS edge was bound to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallKind {
    /// A declared method with the called name was found.
    Resolved,
    /// No declaration found; the edge loops back to the caller.
    Unresolved,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolved => "RESOLVED",
            Self::Unresolved => "UNRESOLVED",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "RESOLVED" => Some(Self::Resolved),
            "UNRESOLVED" => Some(Self::Unresolved),
            _ => None,
        }
    }
}

impl std::fmt::Display for CallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A CALLS edge between two method nodes, carrying the raw call-site name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: CallKind,
    pub call_name: String,
}

impl CallEdge {
    pub fn resolved(source: NodeId, target: NodeId, call_name: impl Into<String>) -> Self {
        Self {
            source,
            target,
            kind: CallKind::Resolved,
            call_name: call_name.into(),
        }
    }

    /// Placeholder edge: caller → caller, tagged UNRESOLVED.
    pub fn unresolved(caller: NodeId, call_name: impl Into<String>) -> Self {
        Self {
            source: caller,
            target: caller,
            kind: CallKind::Unresolved,
            call_name: call_name.into(),
        }
    }
}
