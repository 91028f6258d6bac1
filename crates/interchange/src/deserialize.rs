//! Deserialization from parse documents into typed structs.
//!
//! The main entry point is [`parse_document`], which takes the JSON emitted
//! by the document parser for one source file and produces a
//! [`ParsedFile`].

use crate::types::*;
use std::collections::BTreeMap;

/// Errors during parse-document or reference-map deserialization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterchangeError {
    /// The document is missing a required top-level field.
    #[error("document missing required field: '{field}'")]
    MissingField { field: String },
    /// An element inside the document is missing a required field.
    #[error("{kind} '{id}': {message}")]
    ElementError {
        kind: String,
        id: String,
        message: String,
    },
    /// The document structure is invalid.
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    /// The reference map does not match the expected shape.
    #[error("invalid reference map: {0}")]
    InvalidReferenceMap(String),
}

/// Deserialize one parse document into a [`ParsedFile`].
///
/// `fallback_file_name` is used when the document omits `fileName`.
/// Task entries with a kind other than user, service, or business-rule task
/// are skipped; their ids still take part in ordering through the flow list.
pub fn parse_document(
    doc: &serde_json::Value,
    fallback_file_name: Option<&str>,
) -> Result<ParsedFile, InterchangeError> {
    if !doc.is_object() {
        return Err(InterchangeError::InvalidDocument(
            "expected a JSON object".to_string(),
        ));
    }

    let file_name = doc
        .get("fileName")
        .and_then(|v| v.as_str())
        .or(fallback_file_name)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| InterchangeError::MissingField {
            field: "fileName".to_string(),
        })?
        .to_string();

    let process = doc
        .get("process")
        .filter(|p| p.is_object())
        .ok_or_else(|| InterchangeError::MissingField {
            field: "process".to_string(),
        })?;
    let id = process
        .get("id")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| InterchangeError::MissingField {
            field: "process.id".to_string(),
        })?
        .to_string();
    let name = optional_str(process, "name").unwrap_or_else(|| id.clone());

    let call_activities = array_field(doc, "callActivities")?
        .iter()
        .map(parse_call_activity)
        .collect::<Result<Vec<_>, _>>()?;

    let mut tasks = Vec::new();
    for obj in array_field(doc, "tasks")? {
        if let Some(task) = parse_task(obj)? {
            tasks.push(task);
        }
    }

    let flows = array_field(doc, "sequenceFlows")?
        .iter()
        .map(parse_flow)
        .collect::<Result<Vec<_>, _>>()?;

    let start_events = array_field(doc, "startEvents")?
        .iter()
        .filter_map(|v| {
            v.as_str()
                .or_else(|| v.get("id").and_then(|i| i.as_str()))
                .map(|s| s.to_string())
        })
        .collect();

    let diagram = parse_diagram(doc);

    Ok(ParsedFile {
        definition: ProcessDefinition {
            id,
            name,
            file_name,
            call_activities,
            tasks,
            start_events,
        },
        flows,
        diagram,
    })
}

// ── Parsing helpers ─────────────────────────────────────────────────

fn optional_str(obj: &serde_json::Value, field: &str) -> Option<String> {
    obj.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

fn element_str(
    obj: &serde_json::Value,
    kind: &str,
    id: &str,
    field: &str,
) -> Result<String, InterchangeError> {
    obj.get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .ok_or_else(|| InterchangeError::ElementError {
            kind: kind.to_string(),
            id: id.to_string(),
            message: format!("missing '{}' field", field),
        })
}

/// An optional array field. Absent or null means empty; any other
/// non-array value is an error.
fn array_field<'a>(
    doc: &'a serde_json::Value,
    field: &str,
) -> Result<&'a [serde_json::Value], InterchangeError> {
    match doc.get(field) {
        None | Some(serde_json::Value::Null) => Ok(&[]),
        Some(serde_json::Value::Array(arr)) => Ok(arr.as_slice()),
        Some(_) => Err(InterchangeError::InvalidDocument(format!(
            "'{}' must be an array",
            field
        ))),
    }
}

fn parse_call_activity(obj: &serde_json::Value) -> Result<CallActivity, InterchangeError> {
    let id = element_str(obj, "callActivity", "?", "id")?;
    let name = optional_str(obj, "name").unwrap_or_default();
    let called_element = optional_str(obj, "calledElement").filter(|s| !s.is_empty());

    Ok(CallActivity {
        id,
        name,
        called_element,
    })
}

fn parse_task(obj: &serde_json::Value) -> Result<Option<Task>, InterchangeError> {
    let id = element_str(obj, "task", "?", "id")?;
    let raw_kind = element_str(obj, "task", &id, "kind")?;
    let kind = match TaskKind::parse(&raw_kind) {
        Some(k) => k,
        None => return Ok(None), // other activity kinds stay pass-through
    };
    let name = optional_str(obj, "name").unwrap_or_default();

    Ok(Some(Task { id, name, kind }))
}

fn parse_flow(obj: &serde_json::Value) -> Result<SequenceFlow, InterchangeError> {
    let id = optional_str(obj, "id").unwrap_or_default();
    let label = if id.is_empty() { "?" } else { id.as_str() };
    let source_ref = element_str(obj, "sequenceFlow", label, "sourceRef")?;
    let target_ref = element_str(obj, "sequenceFlow", label, "targetRef")?;
    let id = if id.is_empty() {
        format!("{}->{}", source_ref, target_ref)
    } else {
        id
    };

    Ok(SequenceFlow {
        id,
        source_ref,
        target_ref,
    })
}

/// Shapes without numeric `x`/`y` are dropped; they simply get no visual
/// order downstream.
fn parse_diagram(doc: &serde_json::Value) -> BTreeMap<String, DiagramBounds> {
    let Some(shapes) = doc.get("diagram").and_then(|d| d.as_object()) else {
        return BTreeMap::new();
    };

    shapes
        .iter()
        .filter_map(|(element_id, shape)| {
            let x = shape.get("x")?.as_f64()?;
            let y = shape.get("y")?.as_f64()?;
            let width = shape.get("width").and_then(|w| w.as_f64());
            let height = shape.get("height").and_then(|h| h.as_f64());
            Some((
                element_id.clone(),
                DiagramBounds {
                    x,
                    y,
                    width,
                    height,
                },
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_document(extra: serde_json::Value) -> serde_json::Value {
        let mut doc = json!({
            "fileName": "order.bpmn",
            "process": {"id": "Process_Order", "name": "Order"},
        });
        if let (Some(base), Some(extra)) = (doc.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        doc
    }

    #[test]
    fn test_minimal_document() {
        let parsed = parse_document(&make_document(json!({})), None).unwrap();
        assert_eq!(parsed.file_name(), "order.bpmn");
        assert_eq!(parsed.process_id(), "Process_Order");
        assert_eq!(parsed.definition.name, "Order");
        assert!(parsed.definition.call_activities.is_empty());
        assert!(parsed.flows.is_empty());
        assert!(parsed.diagram.is_empty());
    }

    #[test]
    fn test_fallback_file_name() {
        let doc = json!({"process": {"id": "P"}});
        let parsed = parse_document(&doc, Some("child")).unwrap();
        assert_eq!(parsed.file_name(), "child");
        // name defaults to the process id
        assert_eq!(parsed.definition.name, "P");
    }

    #[test]
    fn test_missing_file_name() {
        let doc = json!({"process": {"id": "P"}});
        match parse_document(&doc, None).unwrap_err() {
            InterchangeError::MissingField { field } => assert_eq!(field, "fileName"),
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_process_id() {
        let doc = json!({"fileName": "a", "process": {"name": "A"}});
        match parse_document(&doc, None).unwrap_err() {
            InterchangeError::MissingField { field } => assert_eq!(field, "process.id"),
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_non_object_document() {
        let err = parse_document(&json!([1, 2]), Some("a")).unwrap_err();
        assert!(matches!(err, InterchangeError::InvalidDocument(_)));
    }

    #[test]
    fn test_parse_elements() {
        let doc = make_document(json!({
            "startEvents": ["start", {"id": "start2"}],
            "callActivities": [
                {"id": "ca1", "name": "Check credit", "calledElement": "Process_Credit"},
                {"id": "ca2", "name": "Ship", "calledElement": ""}
            ],
            "tasks": [
                {"id": "t1", "name": "Review", "kind": "userTask"},
                {"id": "t2", "name": "Notify", "kind": "bpmn:ServiceTask"},
                {"id": "t3", "name": "Script", "kind": "scriptTask"}
            ],
            "sequenceFlows": [
                {"id": "f1", "sourceRef": "start", "targetRef": "ca1"},
                {"sourceRef": "ca1", "targetRef": "t1"}
            ],
            "diagram": {
                "ca1": {"x": 100, "y": 80.5, "width": 100, "height": 80},
                "t1": {"x": 300, "y": 80},
                "broken": {"x": "left"}
            }
        }));

        let parsed = parse_document(&doc, None).unwrap();
        let def = &parsed.definition;
        assert_eq!(def.start_events, vec!["start", "start2"]);
        assert_eq!(def.call_activities.len(), 2);
        assert_eq!(
            def.call_activities[0].called_element.as_deref(),
            Some("Process_Credit")
        );
        // empty calledElement is treated as absent
        assert_eq!(def.call_activities[1].called_element, None);

        // scriptTask is not a tracked kind
        assert_eq!(def.tasks.len(), 2);
        assert_eq!(def.tasks[1].kind, TaskKind::ServiceTask);

        assert_eq!(parsed.flows[0].id, "f1");
        assert_eq!(parsed.flows[1].id, "ca1->t1");

        assert_eq!(parsed.diagram.len(), 2);
        assert_eq!(parsed.diagram["ca1"].y, 80.5);
        assert_eq!(parsed.diagram["t1"].width, None);
    }

    #[test]
    fn test_flow_missing_target() {
        let doc = make_document(json!({
            "sequenceFlows": [{"id": "f1", "sourceRef": "a"}]
        }));
        match parse_document(&doc, None).unwrap_err() {
            InterchangeError::ElementError { kind, id, message } => {
                assert_eq!(kind, "sequenceFlow");
                assert_eq!(id, "f1");
                assert!(message.contains("targetRef"));
            }
            other => panic!("expected ElementError, got {:?}", other),
        }
    }

    #[test]
    fn test_array_field_wrong_type() {
        let doc = make_document(json!({"tasks": {"id": "t1"}}));
        let err = parse_document(&doc, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid document: 'tasks' must be an array"
        );
    }

    #[test]
    fn test_corpus_from_documents_keeps_rejects() {
        let good = json!({"fileName": "a.bpmn", "process": {"id": "A"}});
        let bad = json!({"fileName": "b.bpmn"});
        let corpus = Corpus::from_documents(vec![("a", good), ("b", bad)]);

        assert_eq!(corpus.len(), 1);
        assert!(corpus.get("a.bpmn").is_some());
        assert!(corpus.rejected.contains_key("b"));
    }
}
