use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Failures of the schema and service emitters.
#[derive(Debug, Error)]
pub enum EmitError {
    /// A TABLE-flavored argument came without element-type metadata.
    #[error("no table of data for {message}.{argument}")]
    MissingTableOf { message: String, argument: String },
    #[error("write schema")]
    Io(#[from] io::Error),
    #[error("format schema text")]
    Fmt(#[from] std::fmt::Error),
}

impl EmitError {
    pub fn is_missing_table_of(&self) -> bool {
        matches!(self, Self::MissingTableOf { .. })
    }
}

/// Failures while loading the harvested function descriptions.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("read {}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("decode {}: at JSON path {at}: {message}", path.display())]
    Decode { path: PathBuf, at: String, message: String },
    #[error("invalid glob pattern {pattern}")]
    Pattern { pattern: String, source: glob::PatternError },
    #[error("glob entry")]
    Glob(#[from] glob::GlobError),
    #[error("glob pattern matched no files: {0}")]
    NoMatch(String),
}

/// Failures of the external schema compiler.
#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("spawn {program}")]
    Spawn { program: String, source: io::Error },
    #[error("{command:?} exited with {status}: {stderr}")]
    Failed { command: Vec<String>, status: ExitStatus, stderr: String },
}
