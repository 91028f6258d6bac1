//! Reading a corpus directory and the reference map from disk.
//!
//! A corpus directory holds one parse document per `*.json` file. A file
//! that is not valid JSON, or not a valid parse document, does not stop
//! the run: it is recorded as rejected and shows up as an `invalid-file`
//! diagnostic on the graph.

use std::path::{Path, PathBuf};

use procmap_interchange::{Corpus, InterchangeError, ReferenceMap};

use crate::error::CliError;

/// Parse documents found in `dir`, in file-name order.
pub(crate) fn load_corpus(dir: &Path) -> Result<Corpus, CliError> {
    if !dir.is_dir() {
        return Err(CliError::NotADirectory(dir.to_path_buf()));
    }

    let entries = std::fs::read_dir(dir).map_err(|source| CliError::Read {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "json"))
        .collect();
    paths.sort();

    let mut documents = Vec::new();
    let mut unreadable = Vec::new();
    for path in &paths {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let content = std::fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.clone(),
            source,
        })?;
        match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(doc) => documents.push((name, doc)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping file that is not valid JSON");
                unreadable.push((name, InterchangeError::InvalidDocument(format!("invalid JSON: {}", e))));
            }
        }
    }

    // Documents are parsed in path order, so the first of several files
    // claiming the same fileName is the one kept.
    let mut corpus = Corpus::from_documents(documents);
    for (name, err) in unreadable {
        corpus.reject(&name, err);
    }

    tracing::debug!(
        dir = %dir.display(),
        files = corpus.len(),
        rejected = corpus.rejected.len(),
        "corpus loaded"
    );
    Ok(corpus)
}

/// Read a reference map. With `allow_missing`, a map file that does not
/// exist yet reads as an empty map so that write-back can create it.
pub(crate) fn load_reference_map(path: &Path, allow_missing: bool) -> Result<ReferenceMap, CliError> {
    if allow_missing && !path.exists() {
        tracing::debug!(path = %path.display(), "reference map does not exist yet");
        return Ok(ReferenceMap::new());
    }
    let content = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ReferenceMap::from_json_str(&content).map_err(|source| CliError::ReferenceMap {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_reference_map(path: &Path, map: &ReferenceMap) -> Result<(), CliError> {
    let content = map.to_json_pretty().map_err(|source| CliError::ReferenceMap {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, content + "\n").map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_corpus_keeps_bad_members_as_rejected() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("good.json"),
            r#"{"process": {"id": "P_Good"}}"#,
        )
        .unwrap();
        std::fs::write(tmp.path().join("broken.json"), "{ not json").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let corpus = load_corpus(tmp.path()).unwrap();
        // fileName falls back to the file stem
        assert!(corpus.get("good").is_some());
        assert_eq!(corpus.len(), 1);
        assert!(corpus.rejected.contains_key("broken"));
    }

    #[test]
    fn test_load_corpus_duplicate_file_name_rejects_later_path() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("order_v1.json"),
            r#"{"fileName": "order.bpmn", "process": {"id": "P1"}}"#,
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("order_v2.json"),
            r#"{"fileName": "order.bpmn", "process": {"id": "P2"}}"#,
        )
        .unwrap();

        let corpus = load_corpus(tmp.path()).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.get("order.bpmn").unwrap().process_id(), "P1");
        assert!(corpus.rejected.contains_key("order_v2"));
    }

    #[test]
    fn test_load_corpus_rejects_non_directory() {
        let err = load_corpus(Path::new("does/not/exist")).unwrap_err();
        assert!(matches!(err, CliError::NotADirectory(_)));
    }

    #[test]
    fn test_missing_map_allowed_for_write_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("map.json");
        assert_eq!(load_reference_map(&path, true).unwrap(), ReferenceMap::new());
        assert!(matches!(
            load_reference_map(&path, false).unwrap_err(),
            CliError::Read { .. }
        ));
    }

    #[test]
    fn test_map_roundtrip_on_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("map.json");
        let map = ReferenceMap::from_json_str(r#"{"preferredRoot": "a", "files": []}"#).unwrap();
        write_reference_map(&path, &map).unwrap();
        assert_eq!(load_reference_map(&path, false).unwrap(), map);
    }
}
