//! Node and edge types shared by the graph and tree builders.
//!
//! Node ids are composite strings, `"{kind}:{file}:{elementId}"`, with
//! process nodes using `"process:{file}"`. They are unique across the corpus
//! because file names are unique and element ids are unique per file.

use procmap_interchange::TaskKind;
use serde::Serialize;
use std::fmt;

/// Kind of a graph or tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Process,
    InvocationPoint,
    UserTask,
    ServiceTask,
    BusinessRuleTask,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Process => "process",
            NodeKind::InvocationPoint => "invocationPoint",
            NodeKind::UserTask => "userTask",
            NodeKind::ServiceTask => "serviceTask",
            NodeKind::BusinessRuleTask => "businessRuleTask",
        }
    }
}

impl From<TaskKind> for NodeKind {
    fn from(kind: TaskKind) -> Self {
        match kind {
            TaskKind::UserTask => NodeKind::UserTask,
            TaskKind::ServiceTask => NodeKind::ServiceTask,
            TaskKind::BusinessRuleTask => NodeKind::BusinessRuleTask,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Id of the process node for `file`.
pub fn process_node_id(file: &str) -> String {
    format!("process:{}", file)
}

/// Id of an element node inside `file`.
pub fn element_node_id(kind: NodeKind, file: &str, element_id: &str) -> String {
    format!("{}:{}:{}", kind.as_str(), file, element_id)
}

/// Ordering metadata carried by graph and tree nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_order_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
}

/// A node of the unified process graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub name: String,
    pub file: String,
    /// Element id inside the file; the process id for process nodes.
    pub element_id: String,
    #[serde(flatten)]
    pub order: OrderMeta,
}

impl GraphNode {
    pub fn process(file: &str, process_id: &str, name: &str) -> Self {
        GraphNode {
            id: process_node_id(file),
            kind: NodeKind::Process,
            name: name.to_string(),
            file: file.to_string(),
            element_id: process_id.to_string(),
            order: OrderMeta::default(),
        }
    }

    pub fn element(kind: NodeKind, file: &str, element_id: &str, name: &str) -> Self {
        GraphNode {
            id: element_node_id(kind, file, element_id),
            kind,
            name: name.to_string(),
            file: file.to_string(),
            element_id: element_id.to_string(),
            order: OrderMeta::default(),
        }
    }

    /// Display label: the name, or the element id for unnamed elements.
    pub fn label(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.element_id
        } else {
            &self.name
        }
    }
}

/// Kind of a graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeKind {
    /// Logical successor inside one file, pass-through elements collapsed.
    Sequence,
    /// Invocation point -> process node of the invoked file.
    Invocation,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Sequence => "sequence",
            EdgeKind::Invocation => "invocation",
        }
    }
}

/// A directed edge of the unified graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub kind: EdgeKind,
    pub from: String,
    pub to: String,
}

impl GraphEdge {
    pub fn new(kind: EdgeKind, from: &str, to: &str) -> Self {
        GraphEdge {
            id: format!("{}:{}->{}", kind.as_str(), from, to),
            kind,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}
