//! C# extraction.

use tree_sitter::Node;

use crate::indexer::extractor::{node_text, trailing_identifier, StructureExtractor, SyntaxShape};
use crate::types::Language;

static SHAPE: SyntaxShape = SyntaxShape {
    class_kinds: &["class_declaration"],
    body_kinds: &["declaration_list"],
    method_kinds: &["method_declaration"],
    constructor_kinds: &["constructor_declaration"],
    modifier_kinds: &["modifier"],
    invocation_kinds: &["invocation_expression"],
};

#[derive(Debug, Clone, Copy, Default)]
pub struct CSharpExtractor;

impl CSharpExtractor {
    fn callee_name(node: Node<'_>, source: &str) -> Option<String> {
        match node.kind() {
            "identifier" => Some(node_text(node, source).to_string()),
            "generic_name" => {
                let mut cursor = node.walk();
                let ident = node
                    .named_children(&mut cursor)
                    .find(|c| c.kind() == "identifier");
                ident.map(|c| node_text(c, source).to_string())
            }
            "member_access_expression" | "member_binding_expression" => node
                .child_by_field_name("name")
                .and_then(|n| Self::callee_name(n, source)),
            "conditional_access_expression" => {
                let mut cursor = node.walk();
                let last = node.named_children(&mut cursor).last();
                last.and_then(|n| Self::callee_name(n, source))
            }
            _ => trailing_identifier(node_text(node, source)),
        }
    }
}

impl StructureExtractor for CSharpExtractor {
    fn language(&self) -> Language {
        Language::CSharp
    }

    fn shape(&self) -> &'static SyntaxShape {
        &SHAPE
    }

    fn call_name(&self, invocation: Node<'_>, source: &str) -> Option<String> {
        let function = invocation.child_by_field_name("function")?;
        Self::callee_name(function, source)
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
        extract_source(Path::new("Test.cs"), source, Language::CSharp).unwrap()
    }

    #[test]
    fn extracts_classes_methods_and_calls() {
        let classes = extract(
            r#"
            namespace Shop {
                public class OrderService {
                    private readonly Repo _repo;
                    public OrderService(Repo repo) { _repo = repo; Init(); }
                    public void Place(Order o) {
                        Validate(o);
                        _repo.Save(o);
                        Validate(o);
                    }
                    protected internal bool Validate(Order o) { return o.Items.Any(); }
                    static void Helper() { }
                }
            }
            "#,
        );
        assert_eq!(classes.len(), 1);
        let svc = &classes[0];
        assert_eq!(svc.name, "OrderService");
        assert_eq!(svc.visibility, Visibility::Public);

        let names: Vec<&str> = svc.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["OrderService", "Place", "Validate", "Helper"]);

        assert_eq!(svc.methods[0].raw_calls, vec!["Init"]);
        assert_eq!(svc.methods[1].raw_calls, vec!["Validate", "Save"]);
        assert_eq!(svc.methods[2].visibility, Visibility::Protected);
        assert_eq!(svc.methods[2].raw_calls, vec!["Any"]);
        assert_eq!(svc.methods[3].visibility, Visibility::Public);
        assert!(svc.methods[1]
            .definition
            .as_deref()
            .is_some_and(|d| d.starts_with("public void Place")));
    }

    #[test]
    fn class_visibility_defaults_to_private() {
        let classes = extract("class Hidden { void Run() { } }");
        assert_eq!(classes[0].visibility, Visibility::Private);
        assert_eq!(classes[0].methods[0].visibility, Visibility::Public);
    }

    #[test]
    fn internal_class() {
        let classes = extract("internal sealed class Tool { }");
        assert_eq!(classes[0].visibility, Visibility::Internal);
        assert!(classes[0].methods.is_empty());
    }

    #[test]
    fn nested_classes_are_separate_records() {
        let classes = extract(
            r#"
            public class Outer {
                public void A() { B(); }
                private class Inner {
                    public void B() { }
                }
            }
            "#,
        );
        let names: Vec<&str> = classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Outer", "Inner"]);
        assert_eq!(classes[0].methods.len(), 1);
        assert_eq!(classes[1].visibility, Visibility::Private);
        assert_eq!(classes[1].methods[0].name, "B");
    }

    #[test]
    fn generic_and_conditional_calls() {
        let classes = extract(
            r#"
            class C {
                void M() {
                    var x = Create<int>();
                    handler?.Invoke();
                    this.Log("x");
                    base.Dispose();
                }
            }
            "#,
        );
        assert_eq!(
            classes[0].methods[0].raw_calls,
            vec!["Create", "Invoke", "Log", "Dispose"]
        );
    }

    #[test]
    fn interfaces_and_structs_are_not_classes() {
        let classes = extract("interface IRepo { void Save(); } struct P { void M() { } }");
        assert!(classes.is_empty());
    }

    #[test]
    fn expression_bodied_methods_record_calls() {
        let classes = extract("class C { int Total() => Sum(items); }");
        assert_eq!(classes[0].methods[0].raw_calls, vec!["Sum"]);
    }
}
