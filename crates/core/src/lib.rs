//! procmap-core: resolution and ordering engine for process corpora.
//!
//! Turns a [`Corpus`] of parsed process documents into a unified
//! [`ProcessGraph`] and a single rooted, ordered [`TreeNode`].
//!
//! # Public API
//!
//! - [`resolve`] -- invocation point -> target file, reference map first
//! - [`sequence`] -- logical order of one file's elements from its flows
//! - [`graph::build`] -- the unified cross-file graph
//! - [`graph::resolve_invocations`] -- per invocation point resolutions over the graph's file set
//! - [`tree::build`] -- the rooted tree with cycle and ambiguity diagnostics
//!
//! Every stage is a pure function of its inputs. Problems in the corpus are
//! reported as [`Diagnostic`]s, never as errors.

pub mod diagnostic;
pub mod graph;
pub mod model;
pub mod resolve;
pub mod sequence;
pub mod tree;

// ── Convenience re-exports: key types ────────────────────────────────

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};
pub use graph::{BuildOptions, InvocationResolution, ProcessGraph, UnresolvedReference};
pub use model::{EdgeKind, GraphEdge, GraphNode, NodeKind, OrderMeta};
pub use resolve::{
    MatchBasis, MatchSource, Resolution, ResolutionStatus, Resolver, ResolverConfig,
    UnresolvedReason,
};
pub use sequence::{SequenceOrder, MAIN_BRANCH};
pub use tree::{ArtifactHook, TreeNode, TreeOptions, DEFAULT_MAX_DEPTH};

pub use procmap_interchange::{Corpus, ReferenceMap};

// ── Convenience re-exports: pipeline entry points ────────────────────

pub use graph::{build as build_graph, resolve_invocations};
pub use tree::{build as build_tree, compare_siblings, flatten};

/// Build the graph and then the tree in one call.
pub fn build_all(
    corpus: &Corpus,
    graph_options: &BuildOptions<'_>,
    tree_options: &TreeOptions<'_>,
) -> (ProcessGraph, TreeNode) {
    let graph = graph::build(corpus, graph_options);
    let tree = tree::build(&graph, tree_options);
    (graph, tree)
}
