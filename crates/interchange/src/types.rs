//! Typed structs for the parser's per-file output.
//!
//! One [`ParsedFile`] is produced per source document. It bundles the
//! [`ProcessDefinition`] (invocation points and tasks), the raw
//! [`SequenceFlow`] list, and the diagram bounds of every shape. Flows are
//! kept verbatim, including flows touching gateways and intermediate events,
//! because the ordering pass needs to walk through those elements.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::deserialize::InterchangeError;

// ── Process definition ──────────────────────────────────────────────

/// The activity kinds that become tree nodes besides invocation points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskKind {
    UserTask,
    ServiceTask,
    BusinessRuleTask,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::UserTask => "userTask",
            TaskKind::ServiceTask => "serviceTask",
            TaskKind::BusinessRuleTask => "businessRuleTask",
        }
    }

    /// Parse a task kind from the spellings parsers emit: `userTask`,
    /// `UserTask`, `user_task`, or a namespaced `bpmn:userTask`.
    pub fn parse(raw: &str) -> Option<TaskKind> {
        let local = raw.rsplit(':').next().unwrap_or(raw);
        let normalized: String = local
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "usertask" => Some(TaskKind::UserTask),
            "servicetask" => Some(TaskKind::ServiceTask),
            "businessruletask" => Some(TaskKind::BusinessRuleTask),
            _ => None,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to a separately defined process ("call activity").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallActivity {
    pub id: String,
    pub name: String,
    /// Process id this activity invokes, as written by the author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub called_element: Option<String>,
}

/// A user, service, or business-rule task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    pub kind: TaskKind,
}

/// The process declared by one source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDefinition {
    pub id: String,
    pub name: String,
    pub file_name: String,
    #[serde(default)]
    pub call_activities: Vec<CallActivity>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Declared start elements. Empty when the document has none, in which
    /// case ordering starts from elements without incoming flows.
    #[serde(default)]
    pub start_events: Vec<String>,
}

// ── Sequence flows and diagram ──────────────────────────────────────

/// A directed edge between two elements of the same process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceFlow {
    pub id: String,
    pub source_ref: String,
    pub target_ref: String,
}

impl SequenceFlow {
    pub fn new(
        id: impl Into<String>,
        source_ref: impl Into<String>,
        target_ref: impl Into<String>,
    ) -> Self {
        SequenceFlow {
            id: id.into(),
            source_ref: source_ref.into(),
            target_ref: target_ref.into(),
        }
    }
}

/// Shape bounds on the diagram canvas. Origin is top-left, y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagramBounds {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl DiagramBounds {
    pub fn at(x: f64, y: f64) -> Self {
        DiagramBounds {
            x,
            y,
            width: None,
            height: None,
        }
    }
}

/// Everything the parser produced for one source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedFile {
    pub definition: ProcessDefinition,
    #[serde(default)]
    pub flows: Vec<SequenceFlow>,
    /// Element id -> bounds.
    #[serde(default)]
    pub diagram: BTreeMap<String, DiagramBounds>,
}

impl ParsedFile {
    pub fn file_name(&self) -> &str {
        &self.definition.file_name
    }

    pub fn process_id(&self) -> &str {
        &self.definition.id
    }
}

// ── Corpus ──────────────────────────────────────────────────────────

/// The set of parsed documents a build runs over, keyed by file name.
///
/// Documents that failed to deserialize are kept in `rejected` so the graph
/// builder can report them instead of silently dropping them.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub files: BTreeMap<String, ParsedFile>,
    pub rejected: BTreeMap<String, InterchangeError>,
}

impl Corpus {
    pub fn new() -> Self {
        Corpus::default()
    }

    /// Deserialize a batch of parse documents. `name` identifies the source
    /// of each document in `rejected` and is used as the file name when a
    /// document does not carry its own `fileName`.
    pub fn from_documents<I, S>(documents: I) -> Self
    where
        I: IntoIterator<Item = (S, serde_json::Value)>,
        S: Into<String>,
    {
        let mut corpus = Corpus::new();
        for (name, doc) in documents {
            let name = name.into();
            match crate::deserialize::parse_document(&doc, Some(&name)) {
                Ok(parsed) => corpus.insert(&name, parsed),
                Err(e) => corpus.reject(&name, e),
            }
        }
        corpus
    }

    /// Add a parsed file under its `fileName`. The first file with a given
    /// name is kept; a later one is rejected under `source`.
    pub fn insert(&mut self, source: &str, parsed: ParsedFile) {
        let name = parsed.file_name();
        if self.files.contains_key(name) {
            let err = InterchangeError::InvalidDocument(format!(
                "duplicate fileName '{}' (already provided by another document)",
                name
            ));
            self.reject(source, err);
            return;
        }
        self.files.insert(name.to_string(), parsed);
    }

    /// Record a document that cannot take part in the build. A source that
    /// was already rejected gets a numbered key so neither error is lost.
    pub fn reject(&mut self, source: &str, err: InterchangeError) {
        let mut key = source.to_string();
        let mut n = 1;
        while self.rejected.contains_key(&key) {
            n += 1;
            key = format!("{}#{}", source, n);
        }
        self.rejected.insert(key, err);
    }

    pub fn get(&self, file: &str) -> Option<&ParsedFile> {
        self.files.get(file)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// File name without its final extension (`order.bpmn` -> `order`).
pub fn file_stem(file: &str) -> &str {
    Path::new(file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file)
}
