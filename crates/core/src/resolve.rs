//! Cross-file resolution of invocation points.
//!
//! Two stages. The curated reference map is consulted first and, when it
//! names a target file, its answer is final. Otherwise the invocation
//! point's `calledElement` (or its name, when it has none) is compared against
//! the process id of every file in the corpus. A heuristic match is only
//! wired into the graph when it is unique, the corpus is large enough, and
//! its confidence clears the configured threshold; anything else is left
//! for review with a reason attached.

use procmap_interchange::{file_stem, ParsedFile, ReferenceMap};
use serde::Serialize;
use std::collections::BTreeSet;

/// Confidence of a match taken from the reference map.
pub const MAP_CONFIDENCE: f64 = 1.0;

/// Tuning for heuristic acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverConfig {
    /// Minimum confidence for a heuristic match to be auto-accepted.
    pub auto_accept_threshold: f64,
    /// Auto-acceptance is disabled below this many files in the corpus.
    pub min_corpus_files: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            auto_accept_threshold: 0.9,
            min_corpus_files: 2,
        }
    }
}

/// Outcome class of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionStatus {
    Matched,
    Ambiguous,
    Unmatched,
}

impl ResolutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionStatus::Matched => "matched",
            ResolutionStatus::Ambiguous => "ambiguous",
            ResolutionStatus::Unmatched => "unmatched",
        }
    }
}

/// Where a resolution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchSource {
    ReferenceMap,
    Heuristic,
}

/// The comparison that produced a heuristic candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchBasis {
    ExactCalledElement,
    NormalizedCalledElement,
    ExactName,
    NormalizedName,
}

impl MatchBasis {
    pub fn confidence(self) -> f64 {
        match self {
            MatchBasis::ExactCalledElement => 0.95,
            MatchBasis::NormalizedCalledElement => 0.8,
            MatchBasis::ExactName => 0.7,
            MatchBasis::NormalizedName => 0.6,
        }
    }
}

/// Why an invocation point did not get an invocation edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum UnresolvedReason {
    /// No process id in the corpus matched.
    NoCandidates,
    /// Several files matched equally well.
    AmbiguousMatch { candidates: Vec<String> },
    /// The reference map names a file the corpus does not contain.
    #[serde(rename_all = "camelCase")]
    MapFileNotFound { missing_file: String },
    /// A unique heuristic match that was not auto-accepted.
    #[serde(rename_all = "camelCase")]
    LowConfidenceMatch { suggested_file: String, confidence: f64 },
}

impl UnresolvedReason {
    pub fn code(&self) -> crate::diagnostic::DiagnosticCode {
        use crate::diagnostic::DiagnosticCode;
        match self {
            UnresolvedReason::NoCandidates => DiagnosticCode::NoCandidates,
            UnresolvedReason::AmbiguousMatch { .. } => DiagnosticCode::AmbiguousMatch,
            UnresolvedReason::MapFileNotFound { .. } => DiagnosticCode::MapFileNotFound,
            UnresolvedReason::LowConfidenceMatch { .. } => DiagnosticCode::LowConfidenceMatch,
        }
    }
}

/// Result of resolving one invocation point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub status: ResolutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_file: Option<String>,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<MatchSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basis: Option<MatchBasis>,
    /// Whether the match should become an invocation edge.
    pub accepted: bool,
    #[serde(flatten)]
    pub reason: Option<UnresolvedReason>,
}

impl Resolution {
    fn from_map(target_file: &str) -> Self {
        Resolution {
            status: ResolutionStatus::Matched,
            target_file: Some(target_file.to_string()),
            confidence: MAP_CONFIDENCE,
            source: Some(MatchSource::ReferenceMap),
            basis: None,
            accepted: true,
            reason: None,
        }
    }

    fn unmatched(reason: UnresolvedReason, source: Option<MatchSource>) -> Self {
        Resolution {
            status: ResolutionStatus::Unmatched,
            target_file: None,
            confidence: 0.0,
            source,
            basis: None,
            accepted: false,
            reason: Some(reason),
        }
    }

    /// True when this resolution was taken from the heuristic and accepted,
    /// i.e. it should be written back to the reference map.
    pub fn is_auto_accepted(&self) -> bool {
        self.accepted && self.source == Some(MatchSource::Heuristic)
    }
}

/// Resolves invocation points against a fixed set of files and an optional
/// reference-map snapshot.
pub struct Resolver<'a> {
    files: Vec<&'a ParsedFile>,
    map: Option<&'a ReferenceMap>,
    config: ResolverConfig,
}

impl<'a> Resolver<'a> {
    pub fn new<I>(files: I, map: Option<&'a ReferenceMap>, config: ResolverConfig) -> Self
    where
        I: IntoIterator<Item = &'a ParsedFile>,
    {
        let mut files: Vec<&'a ParsedFile> = files.into_iter().collect();
        files.sort_by(|a, b| a.file_name().cmp(b.file_name()));
        Resolver { files, map, config }
    }

    pub fn corpus_size(&self) -> usize {
        self.files.len()
    }

    /// Corpus file matching `name`: the file with exactly that name, else
    /// the single file whose stem equals the stem of `name`.
    pub fn find_file(&self, name: &str) -> Option<&'a str> {
        if let Some(f) = self.files.iter().find(|f| f.file_name() == name) {
            return Some(f.file_name());
        }
        let stem = file_stem(name);
        let mut by_stem = self
            .files
            .iter()
            .filter(|f| file_stem(f.file_name()) == stem);
        match (by_stem.next(), by_stem.next()) {
            (Some(f), None) => Some(f.file_name()),
            _ => None,
        }
    }

    /// Resolve invocation point `invocation_point_id` of `file`.
    ///
    /// `called_element` is the id the author wrote on the invocation point;
    /// when absent the reference map's copy is used, and only when neither
    /// exists does the heuristic fall back to the invocation point's name.
    pub fn resolve(
        &self,
        file: &str,
        invocation_point_id: &str,
        called_element: Option<&str>,
    ) -> Resolution {
        let entry = self.map.and_then(|m| m.lookup(file, invocation_point_id));

        if let Some(target) = entry.and_then(|e| e.target_file.as_deref()) {
            return match self.find_file(target) {
                Some(found) => {
                    tracing::debug!(file, invocation_point_id, target_file = found, "resolved from reference map");
                    Resolution::from_map(found)
                }
                None => {
                    tracing::warn!(
                        file,
                        invocation_point_id,
                        missing = target,
                        "reference map points at a file that is not in the corpus"
                    );
                    Resolution::unmatched(
                        UnresolvedReason::MapFileNotFound {
                            missing_file: target.to_string(),
                        },
                        Some(MatchSource::ReferenceMap),
                    )
                }
            };
        }

        let called = called_element
            .filter(|s| !s.trim().is_empty())
            .or_else(|| entry.and_then(|e| e.called_element.as_deref()))
            .filter(|s| !s.trim().is_empty());
        let name = self
            .activity_name(file, invocation_point_id)
            .or_else(|| entry.map(|e| e.name.as_str()))
            .filter(|s| !s.trim().is_empty());

        self.resolve_heuristic(file, invocation_point_id, called, name)
    }

    fn activity_name(&self, file: &str, invocation_point_id: &str) -> Option<&'a str> {
        self.files
            .iter()
            .find(|f| f.file_name() == file)?
            .definition
            .call_activities
            .iter()
            .find(|ca| ca.id == invocation_point_id)
            .map(|ca| ca.name.as_str())
    }

    fn resolve_heuristic(
        &self,
        file: &str,
        invocation_point_id: &str,
        called: Option<&str>,
        name: Option<&str>,
    ) -> Resolution {
        let mut tiers: Vec<(MatchBasis, &str)> = Vec::new();
        // The name is only a fallback: a calledElement that matches
        // nothing is a miss, not a cue to guess from the label.
        match (called, name) {
            (Some(c), _) => {
                tiers.push((MatchBasis::ExactCalledElement, c));
                tiers.push((MatchBasis::NormalizedCalledElement, c));
            }
            (None, Some(n)) => {
                tiers.push((MatchBasis::ExactName, n));
                tiers.push((MatchBasis::NormalizedName, n));
            }
            (None, None) => {}
        }

        for (basis, key) in tiers {
            let candidates = self.candidates(basis, key);
            if candidates.is_empty() {
                continue;
            }
            if candidates.len() > 1 {
                tracing::debug!(file, invocation_point_id, key, count = candidates.len(), "ambiguous match");
                return Resolution {
                    status: ResolutionStatus::Ambiguous,
                    target_file: None,
                    confidence: 0.0,
                    source: Some(MatchSource::Heuristic),
                    basis: Some(basis),
                    accepted: false,
                    reason: Some(UnresolvedReason::AmbiguousMatch {
                        candidates: candidates.into_iter().map(str::to_string).collect(),
                    }),
                };
            }

            let Some(target) = candidates.into_iter().next().map(str::to_string) else {
                continue;
            };
            let confidence = basis.confidence();
            let accepted = self.files.len() >= self.config.min_corpus_files
                && confidence >= self.config.auto_accept_threshold;
            let reason = if accepted {
                None
            } else {
                tracing::warn!(file, invocation_point_id, target_file = %target, confidence, "heuristic match left for review");
                Some(UnresolvedReason::LowConfidenceMatch {
                    suggested_file: target.clone(),
                    confidence,
                })
            };
            return Resolution {
                status: ResolutionStatus::Matched,
                target_file: Some(target),
                confidence,
                source: Some(MatchSource::Heuristic),
                basis: Some(basis),
                accepted,
                reason,
            };
        }

        tracing::debug!(file, invocation_point_id, "no candidate process");
        Resolution::unmatched(UnresolvedReason::NoCandidates, Some(MatchSource::Heuristic))
    }

    /// File names whose process matches `key` under `basis`, sorted.
    fn candidates(&self, basis: MatchBasis, key: &str) -> BTreeSet<&'a str> {
        match basis {
            MatchBasis::ExactCalledElement | MatchBasis::ExactName => self
                .files
                .iter()
                .filter(|f| f.process_id() == key)
                .map(|f| f.file_name())
                .collect(),
            MatchBasis::NormalizedCalledElement | MatchBasis::NormalizedName => {
                let wanted = normalize(key);
                if wanted.is_empty() {
                    return BTreeSet::new();
                }
                self.files
                    .iter()
                    .filter(|f| {
                        normalize(f.process_id()) == wanted
                            || normalize(file_stem(f.file_name())) == wanted
                    })
                    .map(|f| f.file_name())
                    .collect()
            }
        }
    }
}

/// Lowercased alphanumerics only: `Process_Credit-Check` -> `processcreditcheck`.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
