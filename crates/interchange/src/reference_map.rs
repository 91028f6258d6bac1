//! The curated reference map: invocation point -> file holding its target.
//!
//! The map is advisory. A missing entry only means the resolver falls back
//! to its heuristic; a present entry with a `targetFile` wins outright.
//! Auto-accepted heuristic matches are written back through
//! [`ReferenceMap::upsert`], which never overwrites an explicit target.

use serde::{Deserialize, Serialize};

use crate::deserialize::InterchangeError;

/// Top-level reference-map document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceMap {
    /// Root the tree should start from when the caller does not pick one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_root: Option<String>,
    #[serde(default)]
    pub files: Vec<ReferenceMapFile>,
}

/// Mapping entries for the invocation points of one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceMapFile {
    pub file: String,
    #[serde(default)]
    pub process_id: String,
    #[serde(default)]
    pub invocation_points: Vec<MappedInvocationPoint>,
}

/// One invocation point and, if known, the file its target lives in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedInvocationPoint {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub called_element: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_file: Option<String>,
}

/// A heuristic match that cleared the auto-accept bar and should be
/// persisted to the reference map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedMatch {
    pub file: String,
    pub process_id: String,
    pub invocation_point_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub called_element: Option<String>,
    pub target_file: String,
    pub confidence: f64,
}

impl ReferenceMap {
    pub fn new() -> Self {
        ReferenceMap::default()
    }

    pub fn from_json_str(s: &str) -> Result<Self, InterchangeError> {
        serde_json::from_str(s).map_err(|e| InterchangeError::InvalidReferenceMap(e.to_string()))
    }

    pub fn from_value(value: &serde_json::Value) -> Result<Self, InterchangeError> {
        ReferenceMap::deserialize(value)
            .map_err(|e| InterchangeError::InvalidReferenceMap(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, InterchangeError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| InterchangeError::InvalidReferenceMap(e.to_string()))
    }

    /// Entry for `(file, invocation_point_id)`, if the map has one.
    pub fn lookup(&self, file: &str, invocation_point_id: &str) -> Option<&MappedInvocationPoint> {
        self.files
            .iter()
            .filter(|f| f.file == file)
            .flat_map(|f| f.invocation_points.iter())
            .find(|ip| ip.id == invocation_point_id)
    }

    /// Insert or complete the entry for an accepted match.
    ///
    /// Returns `true` if the document changed. An entry that already has a
    /// `targetFile` is left alone, so applying the same match twice (or
    /// applying it over a curated entry) is a no-op.
    pub fn upsert(&mut self, accepted: &AcceptedMatch) -> bool {
        let idx = match self.files.iter().position(|f| f.file == accepted.file) {
            Some(i) => i,
            None => {
                self.files.push(ReferenceMapFile {
                    file: accepted.file.clone(),
                    process_id: accepted.process_id.clone(),
                    invocation_points: Vec::new(),
                });
                self.files.len() - 1
            }
        };
        let entry = &mut self.files[idx];
        if entry.process_id.is_empty() {
            entry.process_id = accepted.process_id.clone();
        }

        match entry
            .invocation_points
            .iter_mut()
            .find(|ip| ip.id == accepted.invocation_point_id)
        {
            Some(ip) if ip.target_file.is_some() => false,
            Some(ip) => {
                ip.target_file = Some(accepted.target_file.clone());
                if ip.called_element.is_none() {
                    ip.called_element = accepted.called_element.clone();
                }
                true
            }
            None => {
                entry.invocation_points.push(MappedInvocationPoint {
                    id: accepted.invocation_point_id.clone(),
                    name: accepted.name.clone(),
                    called_element: accepted.called_element.clone(),
                    target_file: Some(accepted.target_file.clone()),
                });
                true
            }
        }
    }

    /// Upsert every match; returns how many changed the document.
    pub fn apply(&mut self, accepted: &[AcceptedMatch]) -> usize {
        accepted.iter().filter(|m| self.upsert(m)).count()
    }
}
