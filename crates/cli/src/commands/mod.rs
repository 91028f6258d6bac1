//! Subcommand implementations.
//!
//! Each command returns `Result<(), CliError>`; `main` reports the error
//! and exits with status 1. Diagnostics about the corpus never fail a run.

pub(crate) mod graph;
pub(crate) mod resolve;
pub(crate) mod tree;

use std::path::Path;

use procmap_interchange::{Corpus, ReferenceMap};

use crate::error::CliError;

/// Corpus and optional reference map shared by every subcommand.
pub(crate) struct Inputs {
    pub corpus: Corpus,
    pub map: Option<ReferenceMap>,
}

impl Inputs {
    pub fn load(dir: &Path, map: Option<&Path>, allow_missing_map: bool) -> Result<Self, CliError> {
        let corpus = crate::corpus::load_corpus(dir)?;
        let map = match map {
            Some(path) => Some(crate::corpus::load_reference_map(path, allow_missing_map)?),
            None => None,
        };
        Ok(Inputs { corpus, map })
    }
}

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
    println!("{}", json);
}
