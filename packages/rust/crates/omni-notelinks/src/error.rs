//! Error types for the note link index.
//!
//! Follows ODF-REP: Library crates use `thiserror` for explicit error enums.
//! Data-quality findings (broken links, orphans) are never errors; they are
//! collected on the store and reported after a run.

use std::path::PathBuf;
use thiserror::Error;

use crate::gather::Stage;

/// Errors raised by the [`NoteStore`](crate::NoteStore) and its persistence layer.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The note cannot be registered (no usable file name).
    #[error("Invalid note: {0}")]
    InvalidNote(PathBuf),

    /// A note with the same path is already registered.
    #[error("Note already registered: {0}")]
    DuplicateNote(PathBuf),

    /// `search` was called with an empty file name.
    #[error("Cannot search the index with an empty file name")]
    EmptySearchKey,

    /// Attempted to persist a note that never went through the checksum stage.
    #[error("Cannot persist note without a checksum: {0}")]
    MissingChecksum(PathBuf),

    /// The persisted index was written with an unsupported schema.
    #[error("Unsupported index schema version: {found} (expected {expected})")]
    SchemaVersion {
        /// Version string found on disk.
        found: String,
        /// Version string this build understands.
        expected: &'static str,
    },

    /// Reading or writing the index file failed.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Index file location.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Index (de)serialization failed.
    #[error("Index serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while running extraction stages.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stage was run before its prerequisites. This is a pipeline assembly
    /// bug and aborts the whole run.
    #[error("Stage {stage} run out of order: {reason}")]
    Ordering {
        /// The stage that refused to run.
        stage: Stage,
        /// Which part of the ordering contract was violated.
        reason: String,
    },

    /// A stage was pointed at a note index the store does not have.
    #[error("No note at index {0}")]
    UnknownNote(usize),

    /// Reading a note failed.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Note path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Store contract violation surfaced during a stage.
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

/// Errors raised by the `scan` / `apply` workflows.
#[derive(Error, Debug)]
pub enum NoteLinksError {
    /// The notes folder does not exist or is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// `apply` was requested before any `scan`.
    #[error("No index found for {0}; run `notelinks scan` first")]
    NoIndex(PathBuf),

    /// Notes were edited after the last scan; they were not rewritten.
    #[error(
        "{} note(s) changed since the last scan ({}); run `notelinks scan` again before applying",
        .notes.len(),
        display_paths(.notes)
    )]
    ContentDrift {
        /// Notes whose on-disk checksum no longer matches the index.
        notes: Vec<PathBuf>,
    },

    /// Filesystem error outside of the pipeline.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// Store or persistence failure.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Pipeline failure.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
