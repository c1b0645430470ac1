use chrono::{DateTime, Utc};

use super::note_mut;
use crate::error::PipelineError;
use crate::store::NoteStore;

/// Refresh `last_modified` from the file's mtime.
pub(super) fn apply(store: &mut NoteStore, index: usize) -> Result<bool, PipelineError> {
    let note = note_mut(store, index)?;
    let modified = std::fs::metadata(&note.path)
        .and_then(|meta| meta.modified())
        .map_err(|source| PipelineError::Io {
            path: note.path.clone(),
            source,
        })?;
    note.last_modified = Some(DateTime::<Utc>::from(modified));
    Ok(true)
}
