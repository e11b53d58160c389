//! Read-only graph queries: call tree, call path, reverse call stack,
//! call statistics, class listings.
//!
//! Tree walks are depth-first with a path-local visited set: a method may
//! show up under several branches but never twice along one path, so cycles
//! terminate. Path search is breadth-first with a global visited set and
//! returns the shortest path by edge count. Only RESOLVED edges are walked;
//! UNRESOLVED placeholders loop on their caller and lead nowhere.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::error::{CallGraphError, Result};
use crate::graph::backend::GraphBackend;
use crate::types::{CallKind, MethodNode, NodeId, Visibility};

/// Deepest call tree the engine will expand.
pub const MAX_TREE_DEPTH: u32 = 15;
/// Longest call path (in edges) the engine will search.
pub const MAX_PATH_DEPTH: u32 = 20;
/// Deepest reverse call stack the engine will expand.
pub const MAX_REVERSE_DEPTH: u32 = 15;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// A method as it appears in a tree level.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TreeNode {
    pub class_name: String,
    pub method_name: String,
    pub visibility: Visibility,
    /// Resolved callees as `Class.Method`, sorted.
    pub calls: Vec<String>,
}

impl TreeNode {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.class_name, self.method_name)
    }
}

/// Depth level → methods reached at that depth. Level 0 holds the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallTree {
    pub max_depth: u32,
    pub levels: BTreeMap<u32, BTreeSet<TreeNode>>,
}

impl CallTree {
    /// Every distinct `Class.Method` at `depth`, sorted.
    pub fn names_at(&self, depth: u32) -> Vec<String> {
        self.levels
            .get(&depth)
            .map(|level| level.iter().map(TreeNode::qualified_name).collect())
            .unwrap_or_default()
    }

    /// Deepest non-empty level.
    pub fn depth(&self) -> u32 {
        self.levels.keys().next_back().copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathStep {
    pub index: usize,
    pub class_name: String,
    pub method_name: String,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallPath {
    pub steps: Vec<PathStep>,
}

impl CallPath {
    /// Number of CALLS edges along the path.
    pub fn hops(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodStats {
    pub class_name: String,
    pub method_name: String,
    pub visibility: Visibility,
    /// All outgoing CALLS, UNRESOLVED included.
    pub outgoing: usize,
    /// Incoming RESOLVED CALLS only.
    pub incoming: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSummary {
    pub total_methods: usize,
    pub methods_with_outgoing: usize,
    pub methods_with_incoming: usize,
    pub total_resolved_calls: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallStatistics {
    pub methods: Vec<MethodStats>,
    pub summary: StatsSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassInfo {
    pub name: String,
    pub file_path: String,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSummary {
    pub name: String,
    pub visibility: Visibility,
    /// `Class.Method` targets, sorted.
    pub resolved_calls: Vec<String>,
    /// Raw names that found no target, sorted.
    pub unresolved_calls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassGraph {
    pub class_name: String,
    /// Every file declaring the class (more than one for partial classes).
    pub files: Vec<String>,
    pub methods: Vec<MethodSummary>,
}

// ---------------------------------------------------------------------------
// Walk: per-query lookup cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Callees,
    Callers,
}

/// Memoizes node and neighbour lookups for the lifetime of one query.
struct Walk<'a> {
    backend: &'a dyn GraphBackend,
    methods: HashMap<NodeId, MethodNode>,
    callees: HashMap<NodeId, Vec<NodeId>>,
    callers: HashMap<NodeId, Vec<NodeId>>,
}

impl<'a> Walk<'a> {
    fn new(backend: &'a dyn GraphBackend) -> Self {
        Self {
            backend,
            methods: HashMap::new(),
            callees: HashMap::new(),
            callers: HashMap::new(),
        }
    }

    fn method(&mut self, id: NodeId) -> Result<MethodNode> {
        if let Some(m) = self.methods.get(&id) {
            return Ok(m.clone());
        }
        let node = self.backend.method(id)?.ok_or_else(|| {
            CallGraphError::Inconsistent(format!("CALLS edge points at missing method {id}"))
        })?;
        self.methods.insert(id, node.clone());
        Ok(node)
    }

    fn neighbours(&mut self, id: NodeId, direction: Direction) -> Result<Vec<NodeId>> {
        let cache = match direction {
            Direction::Callees => &self.callees,
            Direction::Callers => &self.callers,
        };
        if let Some(ids) = cache.get(&id) {
            return Ok(ids.clone());
        }

        let ids: Vec<NodeId> = match direction {
            Direction::Callees => self
                .backend
                .outgoing_calls(id)?
                .into_iter()
                .filter(|e| e.kind == CallKind::Resolved)
                .map(|e| e.target)
                .collect(),
            Direction::Callers => self
                .backend
                .incoming_calls(id)?
                .into_iter()
                .filter(|e| e.kind == CallKind::Resolved)
                .map(|e| e.source)
                .collect(),
        };
        // Several raw names can bind to the same neighbour.
        let mut seen = HashSet::new();
        let ids: Vec<NodeId> = ids.into_iter().filter(|id| seen.insert(*id)).collect();

        match direction {
            Direction::Callees => self.callees.insert(id, ids.clone()),
            Direction::Callers => self.callers.insert(id, ids.clone()),
        };
        Ok(ids)
    }

    fn tree_node(&mut self, id: NodeId) -> Result<TreeNode> {
        let method = self.method(id)?;
        let mut calls = Vec::new();
        for callee in self.neighbours(id, Direction::Callees)? {
            calls.push(self.method(callee)?.qualified_name());
        }
        calls.sort();
        calls.dedup();
        Ok(TreeNode {
            class_name: method.class_name,
            method_name: method.name,
            visibility: method.visibility,
            calls,
        })
    }

    fn path_step(&mut self, index: usize, id: NodeId) -> Result<PathStep> {
        let method = self.method(id)?;
        Ok(PathStep {
            index,
            class_name: method.class_name,
            method_name: method.name,
            visibility: method.visibility,
        })
    }

    /// Depth-first expansion below `id`, recording every node reached.
    fn expand(
        &mut self,
        id: NodeId,
        depth: u32,
        max_depth: u32,
        direction: Direction,
        path: &mut HashSet<NodeId>,
        levels: &mut BTreeMap<u32, BTreeSet<TreeNode>>,
    ) -> Result<()> {
        if depth >= max_depth {
            return Ok(());
        }
        for next in self.neighbours(id, direction)? {
            if path.contains(&next) {
                continue;
            }
            let node = self.tree_node(next)?;
            levels.entry(depth + 1).or_default().insert(node);
            path.insert(next);
            self.expand(next, depth + 1, max_depth, direction, path, levels)?;
            path.remove(&next);
        }
        Ok(())
    }
}

fn check_depth(operation: &'static str, requested: u32, limit: u32) -> Result<()> {
    if requested > limit {
        return Err(CallGraphError::DepthLimitExceeded {
            operation,
            requested,
            limit,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// TraversalEngine
// ---------------------------------------------------------------------------

/// Stateless query layer over a [`GraphBackend`].
pub struct TraversalEngine<'a> {
    backend: &'a dyn GraphBackend,
}

impl<'a> TraversalEngine<'a> {
    pub fn new(backend: &'a dyn GraphBackend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &'a dyn GraphBackend {
        self.backend
    }

    fn lookup(&self, class_name: &str, method_name: &str) -> Result<MethodNode> {
        self.backend
            .find_method(class_name, method_name)?
            .ok_or_else(|| CallGraphError::method_not_found(class_name, method_name))
    }

    fn tree(
        &self,
        class_name: &str,
        method_name: &str,
        max_depth: u32,
        direction: Direction,
    ) -> Result<CallTree> {
        let root = self.lookup(class_name, method_name)?;
        let mut walk = Walk::new(self.backend);
        let mut levels: BTreeMap<u32, BTreeSet<TreeNode>> = BTreeMap::new();
        levels.entry(0).or_default().insert(walk.tree_node(root.id)?);

        let mut path = HashSet::from([root.id]);
        walk.expand(root.id, 0, max_depth, direction, &mut path, &mut levels)?;
        Ok(CallTree { max_depth, levels })
    }

    // -------------------------------------------------------------------
    // call_tree / reverse_call_stack
    // -------------------------------------------------------------------

    /// Methods reachable from `class.method` over outgoing RESOLVED calls,
    /// grouped by depth. `max_depth` may not exceed [`MAX_TREE_DEPTH`].
    pub fn call_tree(&self, class_name: &str, method_name: &str, max_depth: u32) -> Result<CallTree> {
        check_depth("call_tree", max_depth, MAX_TREE_DEPTH)?;
        self.tree(class_name, method_name, max_depth, Direction::Callees)
    }

    /// Transitive callers of `class.method`, grouped by depth.
    /// `max_depth` may not exceed [`MAX_REVERSE_DEPTH`].
    pub fn reverse_call_stack(
        &self,
        class_name: &str,
        method_name: &str,
        max_depth: u32,
    ) -> Result<CallTree> {
        check_depth("reverse_call_stack", max_depth, MAX_REVERSE_DEPTH)?;
        self.tree(class_name, method_name, max_depth, Direction::Callers)
    }

    // -------------------------------------------------------------------
    // call_path
    // -------------------------------------------------------------------

    /// Shortest call chain from one method to another, at most `max_depth`
    /// edges long. `Ok(None)` means no such chain.
    pub fn call_path(
        &self,
        from_class: &str,
        from_method: &str,
        to_class: &str,
        to_method: &str,
        max_depth: u32,
    ) -> Result<Option<CallPath>> {
        check_depth("call_path", max_depth, MAX_PATH_DEPTH)?;
        let from = self.lookup(from_class, from_method)?;
        let to = self.lookup(to_class, to_method)?;
        let mut walk = Walk::new(self.backend);

        if from.id == to.id {
            let step = walk.path_step(0, from.id)?;
            return Ok(Some(CallPath { steps: vec![step] }));
        }

        // BFS: queue holds (node, ids along the path so far).
        let mut queue: VecDeque<(NodeId, Vec<NodeId>)> = VecDeque::new();
        let mut visited: HashSet<NodeId> = HashSet::from([from.id]);
        queue.push_back((from.id, vec![from.id]));

        while let Some((current, path)) = queue.pop_front() {
            if (path.len() as u32) - 1 >= max_depth {
                continue;
            }
            for next in walk.neighbours(current, Direction::Callees)? {
                if next == to.id {
                    let mut full = path.clone();
                    full.push(next);
                    let steps = full
                        .into_iter()
                        .enumerate()
                        .map(|(i, id)| walk.path_step(i, id))
                        .collect::<Result<Vec<_>>>()?;
                    return Ok(Some(CallPath { steps }));
                }
                if visited.insert(next) {
                    let mut extended = path.clone();
                    extended.push(next);
                    queue.push_back((next, extended));
                }
            }
        }
        Ok(None)
    }

    // -------------------------------------------------------------------
    // call_statistics
    // -------------------------------------------------------------------

    /// In/out degree per method, optionally limited to one class.
    pub fn call_statistics(&self, class_filter: Option<&str>) -> Result<CallStatistics> {
        if let Some(class) = class_filter {
            if self.backend.classes_named(class)?.is_empty() {
                return Err(CallGraphError::class_not_found(class));
            }
        }

        let mut methods = Vec::new();
        let mut summary = StatsSummary::default();
        for method in self.backend.methods()? {
            if class_filter.is_some_and(|c| c != method.class_name) {
                continue;
            }
            let outgoing = self.backend.outgoing_calls(method.id)?;
            let incoming = self
                .backend
                .incoming_calls(method.id)?
                .iter()
                .filter(|e| e.kind == CallKind::Resolved)
                .count();

            summary.total_methods += 1;
            if !outgoing.is_empty() {
                summary.methods_with_outgoing += 1;
            }
            if incoming > 0 {
                summary.methods_with_incoming += 1;
            }
            summary.total_resolved_calls += outgoing
                .iter()
                .filter(|e| e.kind == CallKind::Resolved)
                .count();

            methods.push(MethodStats {
                class_name: method.class_name,
                method_name: method.name,
                visibility: method.visibility,
                outgoing: outgoing.len(),
                incoming,
            });
        }
        Ok(CallStatistics { methods, summary })
    }

    // -------------------------------------------------------------------
    // classes / class_graph
    // -------------------------------------------------------------------

    pub fn classes(&self) -> Result<Vec<ClassInfo>> {
        Ok(self
            .backend
            .classes()?
            .into_iter()
            .map(|c| ClassInfo {
                name: c.name,
                file_path: c.file_path,
                visibility: c.visibility,
            })
            .collect())
    }

    /// Methods of `class_name` with their resolved and unresolved calls.
    pub fn class_graph(&self, class_name: &str) -> Result<ClassGraph> {
        let nodes = self.backend.classes_named(class_name)?;
        if nodes.is_empty() {
            return Err(CallGraphError::class_not_found(class_name));
        }

        let mut declared: BTreeMap<String, MethodNode> = BTreeMap::new();
        for class in &nodes {
            for method in self.backend.declared_methods(class.id)? {
                declared.entry(method.name.clone()).or_insert(method);
            }
        }

        let mut walk = Walk::new(self.backend);
        let mut methods = Vec::with_capacity(declared.len());
        for (_, method) in declared {
            let mut resolved = Vec::new();
            let mut unresolved = Vec::new();
            for edge in self.backend.outgoing_calls(method.id)? {
                match edge.kind {
                    CallKind::Resolved => resolved.push(walk.method(edge.target)?.qualified_name()),
                    CallKind::Unresolved => unresolved.push(edge.call_name),
                }
            }
            resolved.sort();
            resolved.dedup();
            unresolved.sort();
            unresolved.dedup();
            methods.push(MethodSummary {
                name: method.name,
                visibility: method.visibility,
                resolved_calls: resolved,
                unresolved_calls: unresolved,
            });
        }

        Ok(ClassGraph {
            class_name: class_name.to_string(),
            files: nodes.into_iter().map(|c| c.file_path).collect(),
            methods,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
