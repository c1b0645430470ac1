use super::{StageContext, note_mut};
use crate::error::PipelineError;
use crate::store::NoteStore;

pub(super) fn apply(
    ctx: &mut StageContext<'_>,
    store: &mut NoteStore,
    index: usize,
) -> Result<bool, PipelineError> {
    let note = note_mut(store, index)?;
    let document = ctx.documents.load(&note.path)?;
    note.title = document.title();
    Ok(note.title.is_some())
}
