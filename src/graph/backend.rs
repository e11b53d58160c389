//! The storage seam between ingest/traversal and a concrete graph store.
//!
//! Callers hold a `&dyn GraphBackend` (or `Arc<dyn GraphBackend>`) and never
//! name a concrete store. All methods take `&self`; implementors provide
//! their own interior locking so concurrent ingest and queries are safe.

use serde::Serialize;

use crate::error::Result;
use crate::types::{
    CallEdge, ClassNode, ClassRecord, MethodNode, MethodRecord, NodeId, Visibility,
};

/// Node and edge totals for a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphCounts {
    pub classes: usize,
    pub methods: usize,
    pub declares: usize,
    pub resolved_calls: usize,
    pub unresolved_calls: usize,
}

/// A method written during the structural phase of ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertedMethod {
    pub id: NodeId,
    pub class_name: String,
    pub name: String,
}

/// Persistent property graph: Class/Method nodes, DECLARES/CALLS edges.
pub trait GraphBackend: Send + Sync {
    /// Short backend identifier for logs, e.g. `"sqlite"`.
    fn backend_name(&self) -> &'static str;

    /// Delete every node and edge.
    fn reset(&self) -> Result<()>;

    // -- Writes -----------------------------------------------------------

    /// MERGE a class on `(name, file_path)`; visibility is overwritten.
    fn upsert_class(&self, name: &str, file_path: &str, visibility: Visibility) -> Result<NodeId>;

    /// MERGE a method on `(name, class_name)`; non-key attributes are overwritten.
    ///
    /// `file_path` is the file the record came from. Fails with `Ingest`
    /// when no class called `class_name` exists.
    fn upsert_method(
        &self,
        file_path: &str,
        class_name: &str,
        record: &MethodRecord,
        keep_definition: bool,
    ) -> Result<NodeId>;

    /// MERGE a DECLARES edge.
    fn upsert_declares(&self, class_id: NodeId, method_id: NodeId) -> Result<()>;

    /// MERGE a CALLS edge on `(source, target, kind, call_name)`.
    fn upsert_call(&self, edge: &CallEdge) -> Result<()>;

    /// Drop every outgoing CALLS edge of `method_id`.
    fn clear_calls_from(&self, method_id: NodeId) -> Result<()>;

    /// Replace the outgoing CALLS edges of `method_id` with `edges`.
    ///
    /// The default runs clear then upsert; stores with transactions should
    /// override it so readers never observe the cleared state.
    fn replace_calls_from(&self, method_id: NodeId, edges: &[CallEdge]) -> Result<()> {
        self.clear_calls_from(method_id)?;
        for edge in edges {
            self.upsert_call(edge)?;
        }
        Ok(())
    }

    /// Write the classes and methods of one file (no CALLS edges).
    ///
    /// Returns the methods written, in record order. Stores with
    /// transactions should override this so a failing file leaves no
    /// partial state behind.
    fn write_file_structure(
        &self,
        file_path: &str,
        classes: &[ClassRecord],
        keep_definitions: bool,
    ) -> Result<Vec<UpsertedMethod>> {
        let mut written = Vec::new();
        for class in classes {
            let class_id = self.upsert_class(&class.name, file_path, class.visibility)?;
            for method in &class.methods {
                let method_id = self.upsert_method(file_path, &class.name, method, keep_definitions)?;
                self.upsert_declares(class_id, method_id)?;
                written.push(UpsertedMethod {
                    id: method_id,
                    class_name: class.name.clone(),
                    name: method.name.clone(),
                });
            }
        }
        Ok(written)
    }

    // -- Reads ------------------------------------------------------------

    /// Every class, sorted by `(name, file_path)`.
    fn classes(&self) -> Result<Vec<ClassNode>>;

    /// Classes with the given name (one per file), sorted by file path.
    fn classes_named(&self, name: &str) -> Result<Vec<ClassNode>>;

    fn method(&self, id: NodeId) -> Result<Option<MethodNode>>;

    fn find_method(&self, class_name: &str, name: &str) -> Result<Option<MethodNode>>;

    /// Methods with the given name across all classes, sorted by `(class_name, name)`.
    fn methods_named(&self, name: &str) -> Result<Vec<MethodNode>>;

    /// Every method, sorted by `(class_name, name)`.
    fn methods(&self) -> Result<Vec<MethodNode>>;

    /// Methods declared by `class_id`, sorted by name.
    fn declared_methods(&self, class_id: NodeId) -> Result<Vec<MethodNode>>;

    /// Outgoing CALLS edges of a method (both kinds), sorted by `(target, kind, call_name)`.
    fn outgoing_calls(&self, method_id: NodeId) -> Result<Vec<CallEdge>>;

    /// Incoming CALLS edges of a method (both kinds), sorted by `(source, kind, call_name)`.
    fn incoming_calls(&self, method_id: NodeId) -> Result<Vec<CallEdge>>;

    fn counts(&self) -> Result<GraphCounts>;
}
