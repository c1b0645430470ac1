//! Backlink and orphan stages.
//!
//! Both work on processed notes only, from both ends of every edge, so the
//! store-level sets stay exact for notes that were skipped.

use std::collections::BTreeSet;

use crate::error::PipelineError;
use crate::note::NoteLink;
use crate::store::NoteStore;

pub(super) fn apply_backlinks(store: &mut NoteStore, index: usize) -> Result<bool, PipelineError> {
    let note = store.get(index).ok_or(PipelineError::UnknownNote(index))?;
    let path = note.path.clone();
    let file_name = note.file_name().unwrap_or_default().to_string();
    let forward_links: Vec<NoteLink> = note.forward_links.iter().cloned().collect();

    // as origin
    store.broken_links_mut().retain(|link| link.origin_path != path);
    for link in forward_links {
        match store.position(&link.destination_file_name)? {
            Some(position) => {
                if let Some(destination) = store.get_mut(position) {
                    destination.backlinks.insert(link);
                }
            }
            None => {
                store.broken_links_mut().insert(link);
            }
        }
    }

    // as destination
    let incoming: BTreeSet<NoteLink> = store
        .iter()
        .flat_map(|origin| origin.forward_links.iter())
        .filter(|link| link.destination_file_name == file_name)
        .cloned()
        .collect();
    store
        .broken_links_mut()
        .retain(|link| link.destination_file_name != file_name);

    let note = store
        .get_mut(index)
        .ok_or(PipelineError::UnknownNote(index))?;
    note.backlinks = incoming;
    Ok(!note.backlinks.is_empty())
}

pub(super) fn apply_orphan(store: &mut NoteStore, index: usize) -> Result<bool, PipelineError> {
    let note = store.get(index).ok_or(PipelineError::UnknownNote(index))?;
    let orphaned = note.backlinks.is_empty();
    let path = note.path.clone();
    if orphaned {
        store.orphans_mut().insert(path);
    } else {
        store.orphans_mut().remove(&path);
    }
    Ok(orphaned)
}
