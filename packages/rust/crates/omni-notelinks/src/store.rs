//! The note index aggregate: notes plus per-run pipeline metadata.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::IndexError;
use crate::gather::Stage;
use crate::note::{Note, NoteLink};

/// Ordered collection of notes for one notes folder, unique by path.
#[derive(Debug, Clone, Default)]
pub struct NoteStore {
    root: PathBuf,
    notes: Vec<Note>,
    registered_gatherers: BTreeSet<Stage>,
    broken_links: BTreeSet<NoteLink>,
    orphans: BTreeSet<PathBuf>,
    use_time: Option<DateTime<Utc>>,
    scan_time: Option<DateTime<Utc>>,
}

impl NoteStore {
    /// Empty store for the notes folder at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Notes folder this store indexes.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Append a note.
    ///
    /// # Errors
    ///
    /// [`IndexError::InvalidNote`] when the path has no file name,
    /// [`IndexError::DuplicateNote`] when the path is already registered.
    pub fn register(&mut self, note: Note) -> Result<(), IndexError> {
        if note.file_name().is_none_or(str::is_empty) {
            return Err(IndexError::InvalidNote(note.path));
        }
        if self.notes.iter().any(|existing| existing == &note) {
            return Err(IndexError::DuplicateNote(note.path));
        }
        self.notes.push(note);
        Ok(())
    }

    /// Position of the note whose base file name equals `file_name`.
    ///
    /// # Errors
    ///
    /// [`IndexError::EmptySearchKey`] when `file_name` is empty.
    pub fn position(&self, file_name: &str) -> Result<Option<usize>, IndexError> {
        if file_name.is_empty() {
            return Err(IndexError::EmptySearchKey);
        }
        Ok(self
            .notes
            .iter()
            .position(|note| note.file_name() == Some(file_name)))
    }

    /// Note whose base file name equals `file_name`; `Ok(None)` when not indexed.
    ///
    /// # Errors
    ///
    /// [`IndexError::EmptySearchKey`] when `file_name` is empty.
    pub fn search(&self, file_name: &str) -> Result<Option<&Note>, IndexError> {
        Ok(self.position(file_name)?.map(|idx| &self.notes[idx]))
    }

    /// Whether a note with this exact path is registered.
    #[must_use]
    pub fn contains_path(&self, path: &Path) -> bool {
        self.notes.iter().any(|note| note.path == path)
    }

    /// All notes in registration order.
    #[must_use]
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Mutable access to all notes.
    pub fn notes_mut(&mut self) -> &mut [Note] {
        &mut self.notes
    }

    /// Note at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Note> {
        self.notes.get(index)
    }

    /// Mutable note at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Note> {
        self.notes.get_mut(index)
    }

    /// Number of notes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// Whether the store has no notes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Iterate notes in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Note> {
        self.notes.iter()
    }

    /// Links whose destination is not indexed.
    #[must_use]
    pub fn broken_links(&self) -> &BTreeSet<NoteLink> {
        &self.broken_links
    }

    pub(crate) fn broken_links_mut(&mut self) -> &mut BTreeSet<NoteLink> {
        &mut self.broken_links
    }

    /// Paths of notes nothing links to.
    #[must_use]
    pub fn orphans(&self) -> &BTreeSet<PathBuf> {
        &self.orphans
    }

    pub(crate) fn orphans_mut(&mut self) -> &mut BTreeSet<PathBuf> {
        &mut self.orphans
    }

    /// Stages that have run during the current pipeline execution.
    #[must_use]
    pub fn registered_gatherers(&self) -> &BTreeSet<Stage> {
        &self.registered_gatherers
    }

    pub(crate) fn register_gatherer(&mut self, stage: Stage) {
        self.registered_gatherers.insert(stage);
    }

    pub(crate) fn clear_gatherers(&mut self) {
        self.registered_gatherers.clear();
    }

    /// Time the index was last written; the incremental boundary.
    #[must_use]
    pub fn use_time(&self) -> Option<DateTime<Utc>> {
        self.use_time
    }

    /// Start time of the most recent pipeline run.
    #[must_use]
    pub fn scan_time(&self) -> Option<DateTime<Utc>> {
        self.scan_time
    }

    pub(crate) fn set_scan_time(&mut self, at: DateTime<Utc>) {
        self.scan_time = Some(at);
    }

    pub(crate) fn set_use_time(&mut self, at: Option<DateTime<Utc>>) {
        self.use_time = at;
    }

    pub(crate) fn restore_derived(
        &mut self,
        broken_links: BTreeSet<NoteLink>,
        orphans: BTreeSet<PathBuf>,
        scan_time: Option<DateTime<Utc>>,
    ) {
        self.broken_links = broken_links;
        self.orphans = orphans;
        self.scan_time = scan_time;
    }

    /// Notes flagged for backlink synchronization.
    pub fn needing_refresh(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter().filter(|note| note.needs_refresh)
    }
}

impl fmt::Display for NoteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.notes.is_empty() {
            write!(f, "NoteStore.empty")
        } else {
            write!(f, "NoteStore(size={})", self.notes.len())
        }
    }
}

impl<'a> IntoIterator for &'a NoteStore {
    type Item = &'a Note;
    type IntoIter = std::slice::Iter<'a, Note>;

    fn into_iter(self) -> Self::IntoIter {
        self.notes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_when_empty() {
        let store = NoteStore::new("/notes");
        assert_eq!(store.to_string(), "NoteStore.empty");
    }

    #[test]
    fn test_display_shows_size() -> Result<(), IndexError> {
        let mut store = NoteStore::new("/notes");
        store.register(Note::new("/notes/a.md"))?;
        store.register(Note::new("/notes/b.md"))?;
        assert_eq!(store.to_string(), "NoteStore(size=2)");
        Ok(())
    }

    #[test]
    fn test_register_rejects_duplicate_path() -> Result<(), IndexError> {
        let mut store = NoteStore::new("/notes");
        store.register(Note::new("/notes/a.md"))?;
        let result = store.register(Note::new("/notes/a.md"));
        assert!(matches!(result, Err(IndexError::DuplicateNote(_))));
        assert_eq!(store.len(), 1);
        Ok(())
    }

    #[test]
    fn test_register_rejects_note_without_file_name() {
        let mut store = NoteStore::new("/notes");
        let result = store.register(Note::new(""));
        assert!(matches!(result, Err(IndexError::InvalidNote(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_search_by_file_name() -> Result<(), IndexError> {
        let mut store = NoteStore::new("/notes");
        store.register(Note::new("/notes/a.md"))?;
        store.register(Note::new("/notes/b.md"))?;

        assert_eq!(
            store.search("b.md")?.map(|note| note.path.clone()),
            Some(PathBuf::from("/notes/b.md"))
        );
        assert!(store.search("missing.md")?.is_none());
        Ok(())
    }

    #[test]
    fn test_search_rejects_empty_key() {
        let store = NoteStore::new("/notes");
        assert!(matches!(store.search(""), Err(IndexError::EmptySearchKey)));
    }
}
