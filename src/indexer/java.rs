//! Java extraction.

use tree_sitter::Node;

use crate::indexer::extractor::{node_text, StructureExtractor, SyntaxShape};
use crate::types::Language;

static SHAPE: SyntaxShape = SyntaxShape {
    class_kinds: &["class_declaration"],
    body_kinds: &["class_body"],
    method_kinds: &["method_declaration"],
    constructor_kinds: &["constructor_declaration"],
    modifier_kinds: &["modifiers"],
    invocation_kinds: &["method_invocation"],
};

#[derive(Debug, Clone, Copy, Default)]
pub struct JavaExtractor;

impl StructureExtractor for JavaExtractor {
    fn language(&self) -> Language {
        Language::Java
    }

    fn shape(&self) -> &'static SyntaxShape {
        &SHAPE
    }

    fn call_name(&self, invocation: Node<'_>, source: &str) -> Option<String> {
        invocation
            .child_by_field_name("name")
            .map(|n| node_text(n, source).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::extractor::extract_source;
    use crate::types::{ClassRecord, Visibility};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn extract(source: &str) -> Vec<ClassRecord> {
        extract_source(Path::new("Test.java"), source, Language::Java).unwrap()
    }

    #[test]
    fn extracts_classes_methods_and_calls() {
        let classes = extract(
            r#"
            package shop;

            public class OrderService {
                private final Repo repo;

                public OrderService(Repo repo) { this.repo = repo; init(); }

                public void place(Order o) {
                    validate(o);
                    repo.save(o);
                    validate(o);
                }

                private boolean validate(Order o) { return o.items().isEmpty(); }
            }
            "#,
        );
        assert_eq!(classes.len(), 1);
        let svc = &classes[0];
        assert_eq!(svc.name, "OrderService");
        assert_eq!(svc.visibility, Visibility::Public);

        let names: Vec<&str> = svc.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["OrderService", "place", "validate"]);
        assert_eq!(svc.methods[0].raw_calls, vec!["init"]);
        assert_eq!(svc.methods[1].raw_calls, vec!["validate", "save"]);
        assert_eq!(svc.methods[2].visibility, Visibility::Private);
        assert_eq!(svc.methods[2].raw_calls, vec!["isEmpty", "items"]);
    }

    #[test]
    fn package_private_members_use_defaults() {
        let classes = extract("class Util { static int twice(int x) { return x * 2; } }");
        assert_eq!(classes[0].visibility, Visibility::Private);
        assert_eq!(classes[0].methods[0].visibility, Visibility::Public);
    }

    #[test]
    fn nested_classes_are_separate_records() {
        let classes = extract(
            r#"
            public class Outer {
                void a() { new Inner().b(); }
                protected static class Inner { void b() { } }
            }
            "#,
        );
        let names: Vec<&str> = classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Outer", "Inner"]);
        assert_eq!(classes[0].methods[0].raw_calls, vec!["b"]);
        assert_eq!(classes[1].visibility, Visibility::Protected);
    }

    #[test]
    fn interfaces_and_enums_are_not_classes() {
        let classes = extract("interface Repo { void save(); } enum Color { RED }");
        assert!(classes.is_empty());
    }
}
