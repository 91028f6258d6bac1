//! Graph Builder: one unified graph over the whole corpus.
//!
//! Every valid file contributes a process node plus one node per invocation
//! point and task. Invocation points are resolved across files; accepted
//! matches become `invocation` edges and the rest are recorded in
//! `unresolved`. Per-file sequence ordering and diagram reading order are
//! annotated onto the element nodes.

use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::model::{
    element_node_id, process_node_id, EdgeKind, GraphEdge, GraphNode, NodeKind,
};
use crate::resolve::{Resolution, Resolver, ResolverConfig, UnresolvedReason};
use crate::sequence;
use procmap_interchange::{file_stem, AcceptedMatch, Corpus, ParsedFile, ReferenceMap};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};

/// An invocation point that did not get an invocation edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedReference {
    pub node_id: String,
    pub file: String,
    pub element_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub called_element: Option<String>,
    #[serde(flatten)]
    pub reason: UnresolvedReason,
}

impl UnresolvedReference {
    /// Diagnostic attached to the invocation point in the tree.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let message = match &self.reason {
            UnresolvedReason::NoCandidates => match &self.called_element {
                Some(called) => format!("no process in the corpus matches '{}'", called),
                None => "no process in the corpus matches this invocation point".to_string(),
            },
            UnresolvedReason::AmbiguousMatch { candidates } => {
                format!("ambiguous target, candidates: {}", candidates.join(", "))
            }
            UnresolvedReason::MapFileNotFound { missing_file } => {
                format!("reference map points at missing file '{}'", missing_file)
            }
            UnresolvedReason::LowConfidenceMatch {
                suggested_file,
                confidence,
            } => format!(
                "possible match '{}' (confidence {:.2}) needs review",
                suggested_file, confidence
            ),
        };
        let context = serde_json::to_value(&self.reason).unwrap_or(serde_json::Value::Null);
        Diagnostic::warning(self.reason.code(), message).with_context(context)
    }
}

/// How one invocation point of a valid file resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResolution {
    pub file: String,
    pub process_id: String,
    pub invocation_point_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub called_element: Option<String>,
    #[serde(flatten)]
    pub resolution: Resolution,
}

/// The unified process graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessGraph {
    pub nodes: BTreeMap<String, GraphNode>,
    pub edges: BTreeMap<String, GraphEdge>,
    /// Process node ids to start a tree from; the preferred root first.
    pub roots: Vec<String>,
    pub unresolved: Vec<UnresolvedReference>,
    /// Problems with the input itself (rejected files, duplicates).
    pub diagnostics: Vec<Diagnostic>,
    /// Heuristic matches to persist to the reference map.
    pub accepted_matches: Vec<AcceptedMatch>,
}

impl ProcessGraph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Edges of `kind` leaving `from`, in id order.
    pub fn outgoing<'g>(
        &'g self,
        from: &'g str,
        kind: EdgeKind,
    ) -> impl Iterator<Item = &'g GraphEdge> + 'g {
        self.edges
            .values()
            .filter(move |e| e.kind == kind && e.from == from)
    }

    /// Process node an invocation point resolves to, if any.
    pub fn invocation_target(&self, node_id: &str) -> Option<&str> {
        self.edges
            .values()
            .find(|e| e.kind == EdgeKind::Invocation && e.from == node_id)
            .map(|e| e.to.as_str())
    }

    pub fn unresolved_for(&self, node_id: &str) -> Option<&UnresolvedReference> {
        self.unresolved.iter().find(|u| u.node_id == node_id)
    }

    /// Process node named by `reference`: a process node id, a file name,
    /// a file stem, or a process id, tried in that order.
    pub fn find_process(&self, reference: &str) -> Option<&str> {
        let processes = || self.nodes.values().filter(|n| n.kind == NodeKind::Process);

        processes()
            .find(|n| n.id == reference)
            .or_else(|| processes().find(|n| n.file == reference))
            .or_else(|| processes().find(|n| file_stem(&n.file) == reference))
            .or_else(|| processes().find(|n| n.element_id == reference))
            .map(|n| n.id.as_str())
    }
}

/// Inputs to [`build`] besides the corpus.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions<'a> {
    pub reference_map: Option<&'a ReferenceMap>,
    /// File name, process id, or process node id to list first in `roots`.
    pub preferred_root: Option<String>,
    pub resolver: ResolverConfig,
}

// ── Validation ──────────────────────────────────────────────────────

/// An element of a valid file that becomes a graph node.
struct Element<'a> {
    id: &'a str,
    name: &'a str,
    kind: NodeKind,
    called_element: Option<&'a str>,
}

fn validate<'a>(file: &'a ParsedFile, diagnostics: &mut Vec<Diagnostic>) -> Option<Vec<Element<'a>>> {
    let name = file.file_name();
    if file.process_id().trim().is_empty() {
        tracing::warn!(file = name, "skipping file with an empty process id");
        diagnostics.push(
            Diagnostic::error(DiagnosticCode::InvalidFile, format!("'{}' has an empty process id", name))
                .with_context(json!({ "file": name })),
        );
        return None;
    }

    let def = &file.definition;
    let elements = def
        .call_activities
        .iter()
        .map(|ca| Element {
            id: ca.id.as_str(),
            name: ca.name.as_str(),
            kind: NodeKind::InvocationPoint,
            called_element: ca.called_element.as_deref(),
        })
        .chain(def.tasks.iter().map(|t| Element {
            id: t.id.as_str(),
            name: t.name.as_str(),
            kind: t.kind.into(),
            called_element: None,
        }));

    let mut seen = BTreeSet::new();
    let mut kept = Vec::new();
    for element in elements {
        if element.id.trim().is_empty() {
            tracing::warn!(file = name, "skipping file with an unnamed element");
            diagnostics.push(
                Diagnostic::error(
                    DiagnosticCode::InvalidFile,
                    format!("'{}' has an element with an empty id", name),
                )
                .with_context(json!({ "file": name })),
            );
            return None;
        }
        if !seen.insert(element.id) {
            tracing::warn!(file = name, element = %element.id, "duplicate element id");
            diagnostics.push(
                Diagnostic::warning(
                    DiagnosticCode::DuplicateElement,
                    format!("'{}' declares element '{}' more than once", name, element.id),
                )
                .with_context(json!({ "file": name, "elementId": element.id })),
            );
            continue;
        }
        kept.push(element);
    }
    Some(kept)
}

/// Files that pass validation, with the elements kept from each.
fn valid_files<'c>(
    corpus: &'c Corpus,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<(&'c ParsedFile, Vec<Element<'c>>)> {
    corpus
        .files
        .values()
        .filter_map(|file| validate(file, diagnostics).map(|elements| (file, elements)))
        .collect()
}

fn resolve_valid(
    valid: &[(&ParsedFile, Vec<Element<'_>>)],
    options: &BuildOptions<'_>,
) -> Vec<InvocationResolution> {
    let resolver = Resolver::new(
        valid.iter().map(|(f, _)| *f),
        options.reference_map,
        options.resolver,
    );
    let mut out = Vec::new();
    for (file, elements) in valid {
        let fname = file.file_name();
        for el in elements.iter().filter(|e| e.kind == NodeKind::InvocationPoint) {
            out.push(InvocationResolution {
                file: fname.to_string(),
                process_id: file.process_id().to_string(),
                invocation_point_id: el.id.to_string(),
                name: el.name.to_string(),
                called_element: el.called_element.map(str::to_string),
                resolution: resolver.resolve(fname, el.id, el.called_element),
            });
        }
    }
    out
}

/// Resolve every invocation point the graph would contain, over the same
/// validated file set [`build`] uses.
pub fn resolve_invocations(corpus: &Corpus, options: &BuildOptions<'_>) -> Vec<InvocationResolution> {
    let mut diagnostics = Vec::new();
    let valid = valid_files(corpus, &mut diagnostics);
    resolve_valid(&valid, options)
}

// ── Build ───────────────────────────────────────────────────────────

/// Build the unified graph for `corpus`.
///
/// Never fails: rejected and invalid files are skipped with a diagnostic,
/// and references that cannot be resolved are listed in `unresolved`.
pub fn build(corpus: &Corpus, options: &BuildOptions<'_>) -> ProcessGraph {
    let mut graph = ProcessGraph::default();

    for (name, err) in &corpus.rejected {
        tracing::warn!(file = %name, error = %err, "skipping unreadable document");
        graph.diagnostics.push(
            Diagnostic::error(DiagnosticCode::InvalidFile, format!("'{}': {}", name, err))
                .with_context(json!({ "file": name })),
        );
    }

    let valid = valid_files(corpus, &mut graph.diagnostics);

    // Nodes
    for (file, elements) in &valid {
        let fname = file.file_name();
        let process = GraphNode::process(fname, file.process_id(), &file.definition.name);
        graph.nodes.insert(process.id.clone(), process);
        for el in elements {
            let node = GraphNode::element(el.kind, fname, el.id, el.name);
            graph.nodes.insert(node.id.clone(), node);
        }
    }

    // Invocation edges
    for inv in resolve_valid(&valid, options) {
        let node_id = element_node_id(NodeKind::InvocationPoint, &inv.file, &inv.invocation_point_id);
        let resolution = inv.resolution;

        match (&resolution.target_file, resolution.accepted) {
            (Some(target), true) => {
                let edge = GraphEdge::new(EdgeKind::Invocation, &node_id, &process_node_id(target));
                graph.edges.insert(edge.id.clone(), edge);
                if resolution.is_auto_accepted() {
                    graph.accepted_matches.push(AcceptedMatch {
                        file: inv.file,
                        process_id: inv.process_id,
                        invocation_point_id: inv.invocation_point_id,
                        name: inv.name,
                        called_element: inv.called_element,
                        target_file: target.clone(),
                        confidence: resolution.confidence,
                    });
                }
            }
            _ => {
                let reason = resolution.reason.unwrap_or(UnresolvedReason::NoCandidates);
                graph.unresolved.push(UnresolvedReference {
                    node_id,
                    file: inv.file,
                    element_id: inv.invocation_point_id,
                    called_element: inv.called_element,
                    reason,
                });
            }
        }
    }

    // Sequence order and collapsed sequence edges
    for (file, elements) in &valid {
        let fname = file.file_name();
        let interesting: BTreeSet<String> = elements.iter().map(|e| e.id.to_string()).collect();
        let element_to_node: BTreeMap<String, String> = elements
            .iter()
            .map(|e| (e.id.to_string(), element_node_id(e.kind, fname, e.id)))
            .collect();

        let orders = sequence::order_from(
            &file.flows,
            &file.definition.start_events,
            &interesting,
            &element_to_node,
        );
        for (node_id, order) in orders {
            if let Some(node) = graph.nodes.get_mut(&node_id) {
                node.order.order_index = Some(order.order_index);
                node.order.branch_id = Some(order.branch_id);
            }
        }

        for (from, to) in sequence::collapse(&file.flows, &interesting) {
            if let (Some(from), Some(to)) = (element_to_node.get(&from), element_to_node.get(&to)) {
                let edge = GraphEdge::new(EdgeKind::Sequence, from, to);
                graph.edges.insert(edge.id.clone(), edge);
            }
        }

        assign_visual_order(&mut graph, file, elements);
    }

    graph.roots = select_roots(&graph, options);

    tracing::debug!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        unresolved = graph.unresolved.len(),
        roots = graph.roots.len(),
        "process graph built"
    );

    graph
}

/// Reading order on the canvas: top to bottom, then left to right.
fn assign_visual_order(graph: &mut ProcessGraph, file: &ParsedFile, elements: &[Element<'_>]) {
    let mut placed: Vec<(f64, f64, &str, NodeKind)> = elements
        .iter()
        .filter_map(|e| file.diagram.get(e.id).map(|b| (b.y, b.x, e.id, e.kind)))
        .collect();
    placed.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then(a.1.total_cmp(&b.1))
            .then(a.2.cmp(b.2))
    });

    for (index, (_, _, id, kind)) in placed.into_iter().enumerate() {
        let node_id = element_node_id(kind, file.file_name(), id);
        if let Some(node) = graph.nodes.get_mut(&node_id) {
            node.order.visual_order_index = Some(index);
        }
    }
}

fn select_roots(graph: &ProcessGraph, options: &BuildOptions<'_>) -> Vec<String> {
    let invoked: BTreeSet<&str> = graph
        .edges
        .values()
        .filter(|e| e.kind == EdgeKind::Invocation)
        .map(|e| e.to.as_str())
        .collect();

    let mut roots: Vec<String> = graph
        .nodes
        .values()
        .filter(|n| n.kind == NodeKind::Process && !invoked.contains(n.id.as_str()))
        .map(|n| n.id.clone())
        .collect();

    let preferred = options
        .preferred_root
        .as_deref()
        .or_else(|| options.reference_map.and_then(|m| m.preferred_root.as_deref()));
    if let Some(reference) = preferred {
        match graph.find_process(reference) {
            Some(id) => {
                roots.retain(|r| r.as_str() != id);
                roots.insert(0, id.to_string());
            }
            None => {
                tracing::warn!(root = reference, "preferred root is not in the graph");
            }
        }
    }

    roots
}
