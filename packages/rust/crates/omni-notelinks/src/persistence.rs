//! Persisted index: one pretty JSON file per notes folder, in a cache slot
//! keyed by the folder's absolute path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use xxhash_rust::xxh3;

use crate::error::IndexError;
use crate::note::{Note, NoteLink};
use crate::store::NoteStore;

/// Schema identifier written into every index file.
pub const INDEX_SCHEMA_VERSION: &str = "omni_notelinks.index.v1";

/// Where the index for one notes folder lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLocation {
    path: PathBuf,
}

impl IndexLocation {
    /// Slot for `notes_dir` under `cache_home`; the directory should already
    /// be absolute so every invocation lands in the same slot.
    #[must_use]
    pub fn for_directory(cache_home: &Path, notes_dir: &Path) -> Self {
        let key = notes_dir.to_string_lossy();
        let slot = format!("{:016x}.json", xxh3::xxh3_64(key.as_bytes()));
        Self {
            path: cache_home.join(slot),
        }
    }

    /// Index file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether an index has been written here.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Forward link as nested under its origin note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardLinkRecord {
    /// Target file name.
    pub destination: String,
    /// Block text around the link.
    pub context: String,
}

/// A link serialized on its own (backlinks, broken links).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Path of the linking note.
    pub origin: PathBuf,
    /// Display title of the linking note.
    pub origin_title: String,
    /// Target file name.
    pub destination: String,
    /// Block text around the link.
    pub context: String,
}

impl From<&NoteLink> for LinkRecord {
    fn from(link: &NoteLink) -> Self {
        Self {
            origin: link.origin_path.clone(),
            origin_title: link.origin_title.clone(),
            destination: link.destination_file_name.clone(),
            context: link.origin_context.clone(),
        }
    }
}

impl From<LinkRecord> for NoteLink {
    fn from(record: LinkRecord) -> Self {
        Self::new(
            record.origin,
            record.origin_title,
            &record.context,
            record.destination,
        )
    }
}

/// Both link directions of one note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinksRecord {
    /// Links found in this note.
    pub forward: Vec<ForwardLinkRecord>,
    /// Links pointing at this note.
    pub back: Vec<LinkRecord>,
}

impl LinksRecord {
    fn of(note: &Note) -> Self {
        Self {
            forward: note
                .forward_links
                .iter()
                .map(|link| ForwardLinkRecord {
                    destination: link.destination_file_name.clone(),
                    context: link.origin_context.clone(),
                })
                .collect(),
            back: note.backlinks.iter().map(LinkRecord::from).collect(),
        }
    }
}

/// Per-note view for external consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteView {
    /// Content checksum recorded at the last scan.
    pub sha256: Option<String>,
    /// Note path.
    pub path: PathBuf,
    /// Link sets.
    pub links: LinksRecord,
}

impl From<&Note> for NoteView {
    fn from(note: &Note) -> Self {
        Self {
            sha256: note.checksum.clone(),
            path: note.path.clone(),
            links: LinksRecord::of(note),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct NoteRecord {
    path: PathBuf,
    title: Option<String>,
    sha256: String,
    last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    synchronized_mtime: Option<DateTime<Utc>>,
    #[serde(default)]
    needs_refresh: bool,
    #[serde(default)]
    links: LinksRecord,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexRecord {
    schema_version: String,
    root: PathBuf,
    use_time: Option<DateTime<Utc>>,
    scan_time: Option<DateTime<Utc>>,
    notes: Vec<NoteRecord>,
    #[serde(default)]
    broken_links: Vec<LinkRecord>,
    #[serde(default)]
    orphans: Vec<PathBuf>,
}

impl NoteRecord {
    fn into_note(self) -> Note {
        let mut note = Note::restored(self.path);
        note.title = self.title;
        note.checksum = Some(self.sha256);
        note.last_modified = self.last_modified;
        note.synchronized_mtime = self.synchronized_mtime;
        note.needs_refresh = self.needs_refresh;

        let origin_title = note.display_title();
        note.forward_links = self
            .links
            .forward
            .into_iter()
            .map(|link| {
                NoteLink::new(
                    note.path.clone(),
                    origin_title.clone(),
                    &link.context,
                    link.destination,
                )
            })
            .collect();
        note.backlinks = self.links.back.into_iter().map(NoteLink::from).collect();
        note
    }
}

impl NoteStore {
    /// Read the index at `location`; `Ok(None)` when nothing was written yet.
    ///
    /// # Errors
    ///
    /// [`IndexError::SchemaVersion`] for an index written by another schema,
    /// [`IndexError::Json`]/[`IndexError::Io`] for unreadable files.
    pub fn load(location: &IndexLocation) -> Result<Option<Self>, IndexError> {
        if !location.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(location.path()).map_err(|source| IndexError::Io {
            path: location.path().to_path_buf(),
            source,
        })?;
        let record: IndexRecord = serde_json::from_str(&raw)?;
        if record.schema_version != INDEX_SCHEMA_VERSION {
            return Err(IndexError::SchemaVersion {
                found: record.schema_version,
                expected: INDEX_SCHEMA_VERSION,
            });
        }

        let mut store = Self::new(record.root);
        for note in record.notes {
            store.register(note.into_note())?;
        }
        store.set_use_time(record.use_time);
        store.restore_derived(
            record
                .broken_links
                .into_iter()
                .map(NoteLink::from)
                .collect::<BTreeSet<_>>(),
            record.orphans.into_iter().collect(),
            record.scan_time,
        );
        Ok(Some(store))
    }

    /// Stamp `use_time = now` and write the whole store to `location`.
    ///
    /// # Errors
    ///
    /// [`IndexError::MissingChecksum`] when a note never went through the
    /// checksum stage; nothing is written in that case.
    pub fn dump(&mut self, location: &IndexLocation) -> Result<(), IndexError> {
        self.ensure_checksums()?;
        self.set_use_time(Some(Utc::now()));
        self.write(location)
    }

    fn ensure_checksums(&self) -> Result<(), IndexError> {
        match self.iter().find(|note| note.checksum.is_none()) {
            Some(note) => Err(IndexError::MissingChecksum(note.path.clone())),
            None => Ok(()),
        }
    }

    /// Write the store as is, keeping the recorded `use_time` and
    /// `scan_time`.
    pub(crate) fn write(&self, location: &IndexLocation) -> Result<(), IndexError> {
        let mut notes = Vec::with_capacity(self.len());
        for note in self.iter() {
            let Some(sha256) = note.checksum.clone() else {
                return Err(IndexError::MissingChecksum(note.path.clone()));
            };
            notes.push(NoteRecord {
                path: note.path.clone(),
                title: note.title.clone(),
                sha256,
                last_modified: note.last_modified,
                synchronized_mtime: note.synchronized_mtime,
                needs_refresh: note.needs_refresh,
                links: LinksRecord::of(note),
            });
        }

        let record = IndexRecord {
            schema_version: INDEX_SCHEMA_VERSION.to_string(),
            root: self.root().to_path_buf(),
            use_time: self.use_time(),
            scan_time: self.scan_time(),
            notes,
            broken_links: self.broken_links().iter().map(LinkRecord::from).collect(),
            orphans: self.orphans().iter().cloned().collect(),
        };

        let io_err = |source| IndexError::Io {
            path: location.path().to_path_buf(),
            source,
        };
        if let Some(parent) = location.path().parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(&record)?;
        let staging = location.path().with_extension("json.tmp");
        std::fs::write(&staging, content).map_err(io_err)?;
        std::fs::rename(&staging, location.path()).map_err(io_err)?;
        Ok(())
    }

    /// External per-note view of every indexed note.
    #[must_use]
    pub fn note_views(&self) -> Vec<NoteView> {
        self.iter().map(NoteView::from).collect()
    }
}
