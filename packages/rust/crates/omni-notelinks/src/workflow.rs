//! `scan`, `apply` and `notes`: the operations behind the command line.

use log::{debug, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::checksum::sha256_file;
use crate::config::NoteLinksConfig;
use crate::crawl::discover_notes;
use crate::error::{IndexError, NoteLinksError};
use crate::gather::{Pipeline, StageReport};
use crate::note::Note;
use crate::persistence::{IndexLocation, LinkRecord, NoteView};
use crate::store::NoteStore;
use crate::synchronize::{SyncOutcome, synchronize_note};

/// Options for [`scan`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Ignore any persisted index and process every note.
    pub rebuild: bool,
}

/// Options for [`apply`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// Synchronize every note, not only those flagged for refresh.
    pub all: bool,
}

/// Result of a scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Absolute notes folder.
    pub root: PathBuf,
    /// Index file written.
    pub index: PathBuf,
    /// Whether the run started from an empty index.
    pub rebuilt: bool,
    /// Number of indexed notes.
    pub notes: usize,
    /// Per-stage counters.
    pub stages: Vec<StageReport>,
    /// Links to notes that are not indexed.
    pub broken_links: Vec<LinkRecord>,
    /// Notes nothing links to.
    pub orphans: Vec<PathBuf>,
    /// Notes whose backlinks section is stale.
    pub needs_refresh: Vec<PathBuf>,
}

/// Result of an apply.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    /// Absolute notes folder.
    pub root: PathBuf,
    /// Notes whose file was rewritten.
    pub rewritten: Vec<PathBuf>,
    /// Notes already up to date.
    pub unchanged: Vec<PathBuf>,
    /// Notes with no place for the section; they stay flagged.
    pub skipped: Vec<PathBuf>,
}

fn resolve_root(dir: &Path) -> Result<PathBuf, NoteLinksError> {
    if !dir.is_dir() {
        return Err(NoteLinksError::NotADirectory(dir.to_path_buf()));
    }
    dir.canonicalize().map_err(|source| NoteLinksError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// Load the persisted store for `root` unless a rebuild is forced or the
/// index can no longer be trusted.
fn load_for_scan(
    location: &IndexLocation,
    rebuild: bool,
) -> Result<Option<NoteStore>, NoteLinksError> {
    if rebuild {
        return Ok(None);
    }
    let store = match NoteStore::load(location) {
        Ok(store) => store,
        Err(IndexError::SchemaVersion { found, expected }) => {
            warn!("index schema {found} is not {expected}; rebuilding");
            None
        }
        Err(e) => return Err(e.into()),
    };
    let Some(store) = store else {
        return Ok(None);
    };
    if let Some(missing) = store.iter().find(|note| !note.path.is_file()) {
        info!("{} no longer exists; rebuilding index", missing.path.display());
        return Ok(None);
    }
    Ok(Some(store))
}

/// Index `dir` and persist the result.
///
/// # Errors
///
/// Fails when `dir` is not a directory, a note cannot be read, the pipeline
/// is misassembled, or the index cannot be written. Broken links and
/// orphans are reported, not raised.
pub fn scan(
    dir: &Path,
    config: &NoteLinksConfig,
    options: ScanOptions,
) -> Result<ScanReport, NoteLinksError> {
    let root = resolve_root(dir)?;
    let location = IndexLocation::for_directory(&config.cache_home, &root);

    let loaded = load_for_scan(&location, options.rebuild)?;
    let rebuilt = loaded.is_none();
    let mut store = loaded.unwrap_or_else(|| NoteStore::new(&root));

    let discovered = discover_notes(&root, &config.extension_suffix()).map_err(|source| {
        NoteLinksError::Io {
            path: root.clone(),
            source,
        }
    })?;
    for path in discovered {
        if !store.contains_path(&path) {
            debug!("discovered {}", path.display());
            store.register(Note::new(path))?;
        }
    }

    let report = Pipeline::new(config.clone()).run(&mut store)?;

    for link in store.broken_links() {
        warn!(
            "broken link in {}: {} does not exist",
            link.origin_path.display(),
            link.destination_file_name
        );
    }
    for orphan in store.orphans() {
        info!("orphan note: {}", orphan.display());
    }

    store.dump(&location)?;
    info!("index for {} written to {}", root.display(), location.path().display());

    Ok(ScanReport {
        notes: store.len(),
        index: location.path().to_path_buf(),
        rebuilt,
        stages: report.stages,
        broken_links: store.broken_links().iter().map(LinkRecord::from).collect(),
        orphans: store.orphans().iter().cloned().collect(),
        needs_refresh: store
            .needing_refresh()
            .map(|note| note.path.clone())
            .collect(),
        root,
    })
}

fn load_existing(root: &Path, location: &IndexLocation) -> Result<NoteStore, NoteLinksError> {
    NoteStore::load(location)?.ok_or_else(|| NoteLinksError::NoIndex(root.to_path_buf()))
}

/// Rewrite the backlinks section of every note flagged for refresh (every
/// note with `options.all`).
///
/// # Errors
///
/// [`NoteLinksError::NoIndex`] before any scan. [`NoteLinksError::ContentDrift`]
/// when notes were edited after the last scan; those notes are left alone
/// and stay flagged, the rest are synchronized and the index is persisted.
///
/// The index keeps the scan's `use_time`, so edits made since that scan are
/// still newer than the boundary the next scan uses.
pub fn apply(
    dir: &Path,
    config: &NoteLinksConfig,
    options: ApplyOptions,
) -> Result<ApplyReport, NoteLinksError> {
    let root = resolve_root(dir)?;
    let location = IndexLocation::for_directory(&config.cache_home, &root);
    let mut store = load_existing(&root, &location)?;

    let mut report = ApplyReport {
        root,
        ..ApplyReport::default()
    };
    let mut drifted = Vec::new();

    for note in store.notes_mut() {
        if !(options.all || note.needs_refresh) {
            continue;
        }
        let current = sha256_file(&note.path).map_err(|source| NoteLinksError::Io {
            path: note.path.clone(),
            source,
        })?;
        if note.checksum.as_deref() != Some(current.as_str()) {
            warn!("{} changed since the last scan; not rewriting", note.path.display());
            note.needs_refresh = true;
            drifted.push(note.path.clone());
            continue;
        }
        match synchronize_note(note, &config.backlinks_heading)? {
            SyncOutcome::Rewritten => report.rewritten.push(note.path.clone()),
            SyncOutcome::Unchanged => report.unchanged.push(note.path.clone()),
            SyncOutcome::Skipped => report.skipped.push(note.path.clone()),
        }
    }

    store.write(&location)?;
    info!(
        "backlinks applied: {} rewritten, {} unchanged, {} skipped, {} drifted",
        report.rewritten.len(),
        report.unchanged.len(),
        report.skipped.len(),
        drifted.len()
    );

    if drifted.is_empty() {
        Ok(report)
    } else {
        Err(NoteLinksError::ContentDrift { notes: drifted })
    }
}

/// External view of every note in the persisted index for `dir`.
///
/// # Errors
///
/// [`NoteLinksError::NoIndex`] before any scan.
pub fn notes(dir: &Path, config: &NoteLinksConfig) -> Result<Vec<NoteView>, NoteLinksError> {
    let root = resolve_root(dir)?;
    let location = IndexLocation::for_directory(&config.cache_home, &root);
    Ok(load_existing(&root, &location)?.note_views())
}
