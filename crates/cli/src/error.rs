//! Error type for CLI file I/O and argument validation.

use std::path::PathBuf;

use procmap_interchange::InterchangeError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("error reading '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("error writing '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid reference map '{}': {source}", path.display())]
    ReferenceMap {
        path: PathBuf,
        source: InterchangeError,
    },
    #[error("--write-back requires --map")]
    WriteBackWithoutMap,
    #[error(transparent)]
    Config(#[from] ConfigError),
}
