//! Indexed notes and the directed links between them.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// One indexed markdown document.
///
/// Identity is the path: two notes are equal iff their paths are equal.
#[derive(Debug, Clone)]
pub struct Note {
    /// Location of the note file.
    pub path: PathBuf,
    /// Text of the first top-level heading (or front matter `title`).
    pub title: Option<String>,
    /// Hex sha256 of the file content at last scan.
    pub checksum: Option<String>,
    /// File modification time, bumped when a linking note changes.
    pub last_modified: Option<DateTime<Utc>>,
    /// Outgoing links, rebuilt on every re-extraction.
    pub forward_links: BTreeSet<NoteLink>,
    /// Incoming links, derived from other notes' forward links.
    pub backlinks: BTreeSet<NoteLink>,
    /// Set by scan when the backlinks section is stale; cleared by apply.
    pub needs_refresh: bool,
    /// File mtime right after apply last rewrote the note.
    pub synchronized_mtime: Option<DateTime<Utc>>,
    discovered: bool,
}

impl Note {
    /// Create a note discovered during the current run.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            title: None,
            checksum: None,
            last_modified: None,
            forward_links: BTreeSet::new(),
            backlinks: BTreeSet::new(),
            needs_refresh: false,
            synchronized_mtime: None,
            discovered: true,
        }
    }

    /// Create a note restored from a persisted index.
    #[must_use]
    pub(crate) fn restored(path: PathBuf) -> Self {
        Self {
            discovered: false,
            ..Self::new(path)
        }
    }

    /// Whether this note was first seen during the current run.
    #[must_use]
    pub fn is_discovered(&self) -> bool {
        self.discovered
    }

    pub(crate) fn mark_indexed(&mut self) {
        self.discovered = false;
    }

    /// Base file name (`a.md`), the key links resolve against.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    /// Title used when rendering links to this note.
    #[must_use]
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| file_stem(&self.path))
    }

    /// Markdown for the generated backlinks section, or an empty string when
    /// nothing links here.
    ///
    /// ```text
    /// ## Backlinks
    ///
    /// - [Origin Title](origin.md)
    ///   - the paragraph that contained the link
    /// ```
    #[must_use]
    pub fn backlinks_block(&self, heading: &str) -> String {
        if self.backlinks.is_empty() {
            return String::new();
        }

        let mut lines: Vec<String> = vec![format!("## {heading}"), String::new()];
        for backlink in &self.backlinks {
            lines.push(format!("- {}", backlink.origin_as_markdown()));
            lines.push(format!("  - {}", backlink.origin_context));
        }
        lines.join("\n")
    }
}

impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Note {}

impl Hash for Note {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.file_name() {
            Some(name) => write!(f, "Note[{name}]"),
            None => write!(f, "Note[None]"),
        }
    }
}

/// A directed, context-annotated edge between two notes.
///
/// Equality, hashing and ordering use `(origin_path, origin_context,
/// destination_file_name)`; the origin title is display data only.
#[derive(Debug, Clone)]
pub struct NoteLink {
    /// Path of the note the link was found in.
    pub origin_path: PathBuf,
    /// Display title of the origin note.
    pub origin_title: String,
    /// Source text of the block around the link, on a single line.
    pub origin_context: String,
    /// File name the link points at.
    pub destination_file_name: String,
}

impl NoteLink {
    /// Build a link, collapsing whitespace in the context.
    #[must_use]
    pub fn new(
        origin_path: impl Into<PathBuf>,
        origin_title: impl Into<String>,
        origin_context: &str,
        destination_file_name: impl Into<String>,
    ) -> Self {
        Self {
            origin_path: origin_path.into(),
            origin_title: origin_title.into(),
            origin_context: normalize_whitespace(origin_context),
            destination_file_name: destination_file_name.into(),
        }
    }

    /// File name of the origin note.
    #[must_use]
    pub fn origin_file_name(&self) -> String {
        self.origin_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// `[Origin Title](origin.md)`
    #[must_use]
    pub fn origin_as_markdown(&self) -> String {
        format!("[{}]({})", self.origin_title, self.origin_file_name())
    }

    fn key(&self) -> (&Path, &str, &str) {
        (
            self.origin_path.as_path(),
            self.origin_context.as_str(),
            self.destination_file_name.as_str(),
        )
    }
}

impl PartialEq for NoteLink {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for NoteLink {}

impl Hash for NoteLink {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for NoteLink {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NoteLink {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for NoteLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.origin_file_name(),
            self.destination_file_name
        )
    }
}

pub(crate) fn normalize_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
