//! Binds raw call-site names to method nodes.
//!
//! Without type information a call can only be matched by name, so an
//! ambiguous name fans out to every candidate and a name with no candidate
//! becomes an UNRESOLVED self-loop. Neither case drops the call.

use crate::error::Result;
use crate::graph::backend::GraphBackend;
use crate::types::{CallEdge, MethodNode};

/// Receivers that refer to the calling instance or its base.
const SELF_RECEIVERS: &[&str] = &["this", "base", "super", "self"];

/// Split `a.b.Method` into `(Some("a.b"), "Method")`.
fn split_call_name(raw: &str) -> (Option<&str>, &str) {
    match raw.trim().rsplit_once('.') {
        Some((qualifier, name)) if !qualifier.is_empty() && !name.is_empty() => {
            (Some(qualifier), name)
        }
        _ => (None, raw.trim()),
    }
}

/// Last segment of a dotted qualifier: `ns.Inner` → `Inner`.
fn last_segment(qualifier: &str) -> &str {
    qualifier.rsplit('.').next().unwrap_or(qualifier)
}

/// Call resolution against the methods currently in a backend.
pub struct CallResolver<'a> {
    backend: &'a dyn GraphBackend,
}

impl<'a> CallResolver<'a> {
    pub fn new(backend: &'a dyn GraphBackend) -> Self {
        Self { backend }
    }

    /// Resolve one raw call name made by `caller`.
    ///
    /// 1. `Class.Method` naming an existing method binds to it alone.
    /// 2. Otherwise every method named like the trailing identifier is a
    ///    candidate, ordered by `(class, name)`.
    /// 3. The caller is a candidate only when the call is a self-call: no
    ///    receiver, or a receiver of `this`/`base`/`super`/the caller's class.
    /// 4. No candidates → one UNRESOLVED edge looping on the caller.
    pub fn resolve(&self, caller: &MethodNode, raw_call: &str) -> Result<Vec<CallEdge>> {
        let (qualifier, name) = split_call_name(raw_call);

        if let Some(qualifier) = qualifier {
            let class = last_segment(qualifier);
            if let Some(target) = self.backend.find_method(class, name)? {
                return Ok(vec![CallEdge::resolved(caller.id, target.id, raw_call)]);
            }
        }

        let self_call = match qualifier {
            None => true,
            Some(q) => {
                let receiver = last_segment(q);
                SELF_RECEIVERS.contains(&receiver) || receiver == caller.class_name
            }
        };

        let edges: Vec<CallEdge> = self
            .backend
            .methods_named(name)?
            .into_iter()
            .filter(|m| m.id != caller.id || self_call)
            .map(|m| CallEdge::resolved(caller.id, m.id, raw_call))
            .collect();

        if edges.is_empty() {
            return Ok(vec![CallEdge::unresolved(caller.id, raw_call)]);
        }
        Ok(edges)
    }

    /// Resolve every raw call of `caller`, de-duplicating identical edges.
    pub fn resolve_all(&self, caller: &MethodNode) -> Result<Vec<CallEdge>> {
        let mut out: Vec<CallEdge> = Vec::new();
        for raw in &caller.raw_calls {
            for edge in self.resolve(caller, raw)? {
                if !out.contains(&edge) {
                    out.push(edge);
                }
            }
        }
        Ok(out)
    }
}

/// Trailing identifier of a raw call name; used to match UNRESOLVED edges
/// against newly declared methods.
pub fn call_target_name(raw_call: &str) -> &str {
    split_call_name(raw_call).1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::memory::MemoryStore;
    use crate::types::{CallKind, ClassRecord, MethodRecord};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    /// A.Run, A.Save, B.Save, C.Load
    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let files = [
            (
                "A.cs",
                ClassRecord::new("A")
                    .with_method(MethodRecord::new("Run"))
                    .with_method(MethodRecord::new("Save")),
            ),
            ("B.cs", ClassRecord::new("B").with_method(MethodRecord::new("Save"))),
            ("C.cs", ClassRecord::new("C").with_method(MethodRecord::new("Load"))),
        ];
        for (path, class) in files {
            store.write_file_structure(path, &[class], true).unwrap();
        }
        store
    }

    fn method(store: &MemoryStore, class: &str, name: &str) -> MethodNode {
        store.find_method(class, name).unwrap().unwrap()
    }

    fn targets(store: &MemoryStore, edges: &[CallEdge]) -> Vec<String> {
        edges
            .iter()
            .map(|e| store.method(e.target).unwrap().unwrap().qualified_name())
            .collect()
    }

    #[test_case("Save", None ; "bare name")]
    #[test_case("repo.Save", Some("repo") ; "member access")]
    #[test_case("A.Save", Some("A") ; "qualified")]
    #[test_case("ns.Inner.Save", Some("ns.Inner") ; "nested qualifier")]
    fn splits_call_names(raw: &str, qualifier: Option<&str>) {
        let (q, name) = split_call_name(raw);
        assert_eq!(q, qualifier);
        assert_eq!(name, "Save");
    }

    #[test]
    fn ambiguous_name_fans_out_in_class_order() {
        let store = seeded();
        let caller = method(&store, "C", "Load");
        let edges = CallResolver::new(&store).resolve(&caller, "Save").unwrap();
        assert_eq!(targets(&store, &edges), vec!["A.Save", "B.Save"]);
        assert!(edges.iter().all(|e| e.kind == CallKind::Resolved));
        assert!(edges.iter().all(|e| e.call_name == "Save"));
    }

    #[test]
    fn qualified_name_binds_exactly() {
        let store = seeded();
        let caller = method(&store, "C", "Load");
        let edges = CallResolver::new(&store).resolve(&caller, "B.Save").unwrap();
        assert_eq!(targets(&store, &edges), vec!["B.Save"]);
    }

    #[test]
    fn unknown_qualifier_falls_back_to_name_match() {
        let store = seeded();
        let caller = method(&store, "C", "Load");
        let edges = CallResolver::new(&store).resolve(&caller, "repo.Save").unwrap();
        assert_eq!(targets(&store, &edges), vec!["A.Save", "B.Save"]);
    }

    #[test]
    fn missing_target_becomes_unresolved_self_loop() {
        let store = seeded();
        let caller = method(&store, "A", "Run");
        let edges = CallResolver::new(&store).resolve(&caller, "Ghost").unwrap();
        assert_eq!(edges, vec![CallEdge::unresolved(caller.id, "Ghost")]);
    }

    #[test]
    fn bare_recursive_call_links_to_self() {
        let store = seeded();
        let caller = method(&store, "A", "Save");
        let edges = CallResolver::new(&store).resolve(&caller, "Save").unwrap();
        assert_eq!(targets(&store, &edges), vec!["A.Save", "B.Save"]);

        let edges = CallResolver::new(&store).resolve(&caller, "this.Save").unwrap();
        assert_eq!(targets(&store, &edges), vec!["A.Save", "B.Save"]);
    }

    #[test]
    fn foreign_receiver_excludes_caller() {
        let store = seeded();
        let caller = method(&store, "A", "Save");
        let edges = CallResolver::new(&store).resolve(&caller, "other.Save").unwrap();
        assert_eq!(targets(&store, &edges), vec!["B.Save"]);
    }

    #[test]
    fn foreign_receiver_with_only_caller_match_is_unresolved() {
        let store = seeded();
        let caller = method(&store, "C", "Load");
        let edges = CallResolver::new(&store).resolve(&caller, "cache.Load").unwrap();
        assert_eq!(edges, vec![CallEdge::unresolved(caller.id, "cache.Load")]);
    }

    #[test]
    fn resolve_all_deduplicates() {
        let store = seeded();
        let mut caller = method(&store, "C", "Load");
        caller.raw_calls = vec!["Run".into(), "A.Run".into(), "Run".into()];
        let edges = CallResolver::new(&store).resolve_all(&caller).unwrap();
        // "Run" and "A.Run" carry different raw names, so both are kept.
        assert_eq!(edges.len(), 2);
        assert_eq!(targets(&store, &edges), vec!["A.Run", "A.Run"]);
    }

    #[test]
    fn call_target_name_strips_receiver() {
        assert_eq!(call_target_name("svc.Repo.Fetch"), "Fetch");
        assert_eq!(call_target_name("Fetch"), "Fetch");
    }
}
