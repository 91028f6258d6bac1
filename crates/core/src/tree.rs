//! Tree Builder: a single rooted, ordered view of the process graph.
//!
//! The tree starts at one process node. A process's children are the
//! invocation points and tasks of its file; an invocation point with an
//! invocation edge gets the invoked process grafted underneath it, so the
//! invocation point itself always stays visible.

use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::graph::{ProcessGraph, UnresolvedReference};
use crate::model::{EdgeKind, GraphNode, NodeKind, OrderMeta};
use serde::Serialize;
use serde_json::json;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Default limit on nested invocations.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Id of the sentinel returned when there is nothing to build.
pub const EMPTY_TREE_ID: &str = "empty";

/// A node of the rendered tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    #[serde(flatten)]
    pub order: OrderMeta,
    pub children: Vec<TreeNode>,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<serde_json::Value>,
}

impl TreeNode {
    fn from_graph(node: &GraphNode) -> Self {
        TreeNode {
            id: node.id.clone(),
            label: node.label().to_string(),
            kind: node.kind,
            file: node.file.clone(),
            element_id: Some(node.element_id.clone()),
            order: node.order.clone(),
            children: Vec::new(),
            diagnostics: Vec::new(),
            artifact: None,
        }
    }

    /// Placeholder tree carrying the reason nothing could be built.
    pub fn empty(diagnostic: Diagnostic) -> Self {
        TreeNode {
            id: EMPTY_TREE_ID.to_string(),
            label: String::new(),
            kind: NodeKind::Process,
            file: String::new(),
            element_id: None,
            order: OrderMeta::default(),
            children: Vec::new(),
            diagnostics: vec![diagnostic],
            artifact: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id == EMPTY_TREE_ID && self.children.is_empty()
    }

    /// Number of nodes in this subtree, itself included.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }

    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

/// Attaches opaque per-node data, e.g. coverage or documentation links.
pub trait ArtifactHook {
    fn artifact(&self, node: &TreeNode) -> Option<serde_json::Value>;
}

impl<F> ArtifactHook for F
where
    F: Fn(&TreeNode) -> Option<serde_json::Value>,
{
    fn artifact(&self, node: &TreeNode) -> Option<serde_json::Value> {
        self(node)
    }
}

/// Options for [`build`].
#[derive(Clone, Copy)]
pub struct TreeOptions<'a> {
    /// Process to start from (process node id, file name, or process id).
    /// Defaults to the graph's first root.
    pub root_id: Option<&'a str>,
    pub max_depth: usize,
    pub artifact_hook: Option<&'a dyn ArtifactHook>,
}

impl Default for TreeOptions<'_> {
    fn default() -> Self {
        TreeOptions {
            root_id: None,
            max_depth: DEFAULT_MAX_DEPTH,
            artifact_hook: None,
        }
    }
}

/// Lookups the descent needs, built once per tree.
struct TreeIndex<'g> {
    children: BTreeMap<&'g str, Vec<&'g GraphNode>>,
    invocations: HashMap<&'g str, &'g str>,
    unresolved: HashMap<&'g str, &'g UnresolvedReference>,
}

impl<'g> TreeIndex<'g> {
    fn new(graph: &'g ProcessGraph) -> Self {
        let mut children: BTreeMap<&str, Vec<&GraphNode>> = BTreeMap::new();
        for node in graph.nodes.values().filter(|n| n.kind != NodeKind::Process) {
            children.entry(node.file.as_str()).or_default().push(node);
        }
        let invocations = graph
            .edges
            .values()
            .filter(|e| e.kind == EdgeKind::Invocation)
            .map(|e| (e.from.as_str(), e.to.as_str()))
            .collect();
        let unresolved = graph
            .unresolved
            .iter()
            .map(|u| (u.node_id.as_str(), u))
            .collect();
        TreeIndex {
            children,
            invocations,
            unresolved,
        }
    }
}

struct Descent<'g, 'o> {
    graph: &'g ProcessGraph,
    index: TreeIndex<'g>,
    options: &'o TreeOptions<'o>,
    /// Process node ids on the current recursion path.
    path: Vec<&'g str>,
}

impl<'g> Descent<'g, '_> {
    fn process(&mut self, process_id: &'g str, depth: usize) -> Option<TreeNode> {
        let graph = self.graph;
        let graph_node = graph.node(process_id)?;
        let mut node = TreeNode::from_graph(graph_node);

        self.path.push(process_id);
        let elements = self
            .index
            .children
            .get(graph_node.file.as_str())
            .cloned()
            .unwrap_or_default();
        for element in elements {
            let child = self.element(element, depth);
            node.children.push(child);
        }
        self.path.pop();

        node.children.sort_by(compare_siblings);
        self.attach_artifact(&mut node);
        Some(node)
    }

    fn element(&mut self, element: &'g GraphNode, depth: usize) -> TreeNode {
        let mut node = TreeNode::from_graph(element);

        if element.kind == NodeKind::InvocationPoint {
            if let Some(&target) = self.index.invocations.get(element.id.as_str()) {
                if self.path.contains(&target) {
                    tracing::warn!(node = %element.id, process = target, "invocation cycle truncated");
                    node.diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticCode::CycleDetected,
                            format!("'{}' invokes '{}', which is already on the path", element.id, target),
                        )
                        .with_context(json!({ "target": target, "path": self.path })),
                    );
                } else if depth + 1 > self.options.max_depth {
                    node.diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticCode::DepthLimitReached,
                            format!("nesting deeper than {} invocations is not expanded", self.options.max_depth),
                        )
                        .with_context(json!({ "target": target, "maxDepth": self.options.max_depth })),
                    );
                } else if let Some(subtree) = self.process(target, depth + 1) {
                    node.children.push(subtree);
                }
            } else if let Some(unresolved) = self.index.unresolved.get(element.id.as_str()) {
                node.diagnostics.push(unresolved.to_diagnostic());
            }
        }

        self.attach_artifact(&mut node);
        node
    }

    fn attach_artifact(&self, node: &mut TreeNode) {
        if let Some(hook) = self.options.artifact_hook {
            node.artifact = hook.artifact(node);
        }
    }
}

/// Build the tree for `graph`.
///
/// Never fails. An empty graph or a missing root yields
/// [`TreeNode::empty`] with an `info` diagnostic explaining why.
pub fn build(graph: &ProcessGraph, options: &TreeOptions<'_>) -> TreeNode {
    if graph.is_empty() {
        return TreeNode::empty(Diagnostic::info(
            DiagnosticCode::EmptyCorpus,
            "the corpus contains no usable process definitions",
        ));
    }

    let root = match options.root_id {
        Some(reference) => match graph.find_process(reference) {
            Some(id) => id,
            None => {
                tracing::warn!(root = reference, "requested root is not in the graph");
                return TreeNode::empty(
                    Diagnostic::info(
                        DiagnosticCode::RootNotFound,
                        format!("no process matches root '{}'", reference),
                    )
                    .with_context(json!({ "rootId": reference })),
                );
            }
        },
        None => match graph.roots.first() {
            Some(id) => id.as_str(),
            None => {
                return TreeNode::empty(Diagnostic::info(
                    DiagnosticCode::NoRoot,
                    "every process is invoked by another; pass a root explicitly",
                ))
            }
        },
    };

    let mut descent = Descent {
        graph,
        index: TreeIndex::new(graph),
        options,
        path: Vec::new(),
    };
    match descent.process(root, 0) {
        Some(tree) => {
            tracing::debug!(root, nodes = tree.size(), "tree built");
            tree
        }
        None => TreeNode::empty(Diagnostic::info(
            DiagnosticCode::RootNotFound,
            format!("root '{}' is not a node of the graph", root),
        )),
    }
}

/// Total sibling order: visual position, logical position, branch, label,
/// then id. Missing values sort after present ones at each step.
pub fn compare_siblings(a: &TreeNode, b: &TreeNode) -> Ordering {
    none_last(a.order.visual_order_index, b.order.visual_order_index)
        .then_with(|| none_last(a.order.order_index, b.order.order_index))
        .then_with(|| none_last(a.order.branch_id.as_deref(), b.order.branch_id.as_deref()))
        .then_with(|| a.label.cmp(&b.label))
        .then_with(|| a.id.cmp(&b.id))
}

fn none_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Depth-first listing of the tree, parents before children.
pub fn flatten(tree: &TreeNode) -> Vec<(usize, &TreeNode)> {
    let mut out = Vec::new();
    let mut stack = vec![(0usize, tree)];
    while let Some((depth, node)) = stack.pop() {
        out.push((depth, node));
        for child in node.children.iter().rev() {
            stack.push((depth + 1, child));
        }
    }
    out
}
