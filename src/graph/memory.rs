//! In-process [`GraphBackend`] guarded by an `RwLock`.
//!
//! Holds the same identity rules as the SQLite store; every write takes the
//! write lock for its whole duration, so multi-step writes are atomic with
//! respect to readers.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{CallGraphError, Result};
use crate::graph::backend::{GraphBackend, GraphCounts, UpsertedMethod};
use crate::types::{
    CallEdge, CallKind, ClassNode, ClassRecord, MethodNode, MethodRecord, NodeId, Visibility,
};

#[derive(Debug, Default)]
struct MemoryGraph {
    next_id: NodeId,
    classes: BTreeMap<NodeId, ClassNode>,
    class_index: HashMap<(String, String), NodeId>,
    methods: BTreeMap<NodeId, MethodNode>,
    method_index: HashMap<(String, String), NodeId>,
    declares: BTreeSet<(NodeId, NodeId)>,
    calls: BTreeSet<CallEdge>,
}

impl MemoryGraph {
    fn allocate_id(&mut self) -> NodeId {
        self.next_id += 1;
        self.next_id
    }

    fn upsert_class(&mut self, name: &str, file_path: &str, visibility: Visibility) -> NodeId {
        let key = (name.to_string(), file_path.to_string());
        if let Some(&id) = self.class_index.get(&key) {
            if let Some(node) = self.classes.get_mut(&id) {
                node.visibility = visibility;
            }
            return id;
        }
        let id = self.allocate_id();
        self.classes.insert(
            id,
            ClassNode {
                id,
                name: key.0.clone(),
                file_path: key.1.clone(),
                visibility,
            },
        );
        self.class_index.insert(key, id);
        id
    }

    fn upsert_method(
        &mut self,
        file_path: &str,
        class_name: &str,
        record: &MethodRecord,
        keep_definition: bool,
    ) -> Result<NodeId> {
        if !self.classes.values().any(|c| c.name == class_name) {
            return Err(CallGraphError::missing_parent_class(file_path, class_name));
        }
        let definition = if keep_definition {
            record.definition.clone()
        } else {
            None
        };
        let key = (record.name.clone(), class_name.to_string());
        if let Some(&id) = self.method_index.get(&key) {
            if let Some(node) = self.methods.get_mut(&id) {
                node.visibility = record.visibility;
                node.raw_calls = record.raw_calls.clone();
                node.definition = definition;
            }
            return Ok(id);
        }
        let id = self.allocate_id();
        self.methods.insert(
            id,
            MethodNode {
                id,
                name: record.name.clone(),
                class_name: class_name.to_string(),
                visibility: record.visibility,
                raw_calls: record.raw_calls.clone(),
                definition,
            },
        );
        self.method_index.insert(key, id);
        Ok(id)
    }

    fn clear_calls_from(&mut self, method_id: NodeId) {
        self.calls.retain(|e| e.source != method_id);
    }
}

/// Graph kept entirely in memory; contents vanish on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    graph: RwLock<MemoryGraph>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryGraph> {
        self.graph.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryGraph> {
        self.graph.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn sorted_methods<'a>(iter: impl Iterator<Item = &'a MethodNode>) -> Vec<MethodNode> {
    let mut out: Vec<MethodNode> = iter.cloned().collect();
    out.sort_by(|a, b| (&a.class_name, &a.name).cmp(&(&b.class_name, &b.name)));
    out
}

impl GraphBackend for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn reset(&self) -> Result<()> {
        let mut graph = self.write();
        let next_id = graph.next_id;
        *graph = MemoryGraph {
            next_id,
            ..MemoryGraph::default()
        };
        tracing::info!("graph reset");
        Ok(())
    }

    // -- Writes -----------------------------------------------------------

    fn upsert_class(&self, name: &str, file_path: &str, visibility: Visibility) -> Result<NodeId> {
        Ok(self.write().upsert_class(name, file_path, visibility))
    }

    fn upsert_method(
        &self,
        file_path: &str,
        class_name: &str,
        record: &MethodRecord,
        keep_definition: bool,
    ) -> Result<NodeId> {
        self.write()
            .upsert_method(file_path, class_name, record, keep_definition)
    }

    fn upsert_declares(&self, class_id: NodeId, method_id: NodeId) -> Result<()> {
        self.write().declares.insert((class_id, method_id));
        Ok(())
    }

    fn upsert_call(&self, edge: &CallEdge) -> Result<()> {
        self.write().calls.insert(edge.clone());
        Ok(())
    }

    fn clear_calls_from(&self, method_id: NodeId) -> Result<()> {
        self.write().clear_calls_from(method_id);
        Ok(())
    }

    fn replace_calls_from(&self, method_id: NodeId, edges: &[CallEdge]) -> Result<()> {
        let mut graph = self.write();
        graph.clear_calls_from(method_id);
        graph.calls.extend(edges.iter().cloned());
        Ok(())
    }

    fn write_file_structure(
        &self,
        file_path: &str,
        classes: &[ClassRecord],
        keep_definitions: bool,
    ) -> Result<Vec<UpsertedMethod>> {
        let mut graph = self.write();
        let mut written = Vec::new();
        for class in classes {
            let class_id = graph.upsert_class(&class.name, file_path, class.visibility);
            for method in &class.methods {
                let method_id = graph.upsert_method(file_path, &class.name, method, keep_definitions)?;
                graph.declares.insert((class_id, method_id));
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

    fn classes(&self) -> Result<Vec<ClassNode>> {
        let mut out: Vec<ClassNode> = self.read().classes.values().cloned().collect();
        out.sort_by(|a, b| (&a.name, &a.file_path).cmp(&(&b.name, &b.file_path)));
        Ok(out)
    }

    fn classes_named(&self, name: &str) -> Result<Vec<ClassNode>> {
        let mut out: Vec<ClassNode> = self
            .read()
            .classes
            .values()
            .filter(|c| c.name == name)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        Ok(out)
    }

    fn method(&self, id: NodeId) -> Result<Option<MethodNode>> {
        Ok(self.read().methods.get(&id).cloned())
    }

    fn find_method(&self, class_name: &str, name: &str) -> Result<Option<MethodNode>> {
        let graph = self.read();
        let key = (name.to_string(), class_name.to_string());
        Ok(graph
            .method_index
            .get(&key)
            .and_then(|id| graph.methods.get(id))
            .cloned())
    }

    fn methods_named(&self, name: &str) -> Result<Vec<MethodNode>> {
        let graph = self.read();
        Ok(sorted_methods(graph.methods.values().filter(|m| m.name == name)))
    }

    fn methods(&self) -> Result<Vec<MethodNode>> {
        Ok(sorted_methods(self.read().methods.values()))
    }

    fn declared_methods(&self, class_id: NodeId) -> Result<Vec<MethodNode>> {
        let graph = self.read();
        let mut out: Vec<MethodNode> = graph
            .declares
            .range((class_id, NodeId::MIN)..=(class_id, NodeId::MAX))
            .filter_map(|(_, method_id)| graph.methods.get(method_id))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn outgoing_calls(&self, method_id: NodeId) -> Result<Vec<CallEdge>> {
        Ok(self
            .read()
            .calls
            .iter()
            .filter(|e| e.source == method_id)
            .cloned()
            .collect())
    }

    fn incoming_calls(&self, method_id: NodeId) -> Result<Vec<CallEdge>> {
        // BTreeSet order is (source, target, kind, call_name); with the
        // target fixed that is (source, kind, call_name).
        Ok(self
            .read()
            .calls
            .iter()
            .filter(|e| e.target == method_id)
            .cloned()
            .collect())
    }

    fn counts(&self) -> Result<GraphCounts> {
        let graph = self.read();
        let resolved = graph
            .calls
            .iter()
            .filter(|e| e.kind == CallKind::Resolved)
            .count();
        Ok(GraphCounts {
            classes: graph.classes.len(),
            methods: graph.methods.len(),
            declares: graph.declares.len(),
            resolved_calls: resolved,
            unresolved_calls: graph.calls.len() - resolved,
        })
    }
}
