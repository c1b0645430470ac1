use super::{StageContext, note_mut};
use crate::checksum::sha256_hex;
use crate::error::PipelineError;
use crate::store::NoteStore;

/// Checksum of the snapshot the other stages read, not a second file read.
pub(super) fn apply(
    ctx: &mut StageContext<'_>,
    store: &mut NoteStore,
    index: usize,
) -> Result<bool, PipelineError> {
    let note = note_mut(store, index)?;
    let document = ctx.documents.load(&note.path)?;
    note.checksum = Some(sha256_hex(document.source().as_bytes()));
    Ok(true)
}
