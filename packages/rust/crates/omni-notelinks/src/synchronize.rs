//! Rewrites the generated backlinks section at the end of a note.
//!
//! Everything above the sentinel heading is kept byte-for-byte; the section
//! itself is regenerated from the index, so rewriting an unchanged graph is
//! a no-op.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use std::path::Path;

use crate::checksum::sha256_hex;
use crate::document::NoteDocument;
use crate::error::NoteLinksError;
use crate::note::Note;

/// What synchronization did to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// File content changed and was written.
    Rewritten,
    /// Rendered content matched the file; nothing written.
    Unchanged,
    /// The section could not be placed as a top-level block; nothing written.
    Skipped,
}

fn trim_line_breaks(text: &str) -> &str {
    text.trim_end_matches(['\n', '\r'])
}

/// `head`, a blank line, then `block`; also the byte offset where `block`
/// starts.
fn append_section(head: &str, block: &str) -> (String, usize) {
    let mut out = head.to_string();
    if !out.is_empty() {
        out.push_str("\n\n");
    }
    let offset = out.len();
    out.push_str(block);
    out.push('\n');
    (out, offset)
}

fn opens_section_at(rendered: &str, offset: usize, heading: &str) -> bool {
    NoteDocument::parse(rendered).sentinel_offset(heading) == Some(offset)
}

/// Content of `document` with its backlinks section replaced by `block`.
///
/// An empty `block` removes an existing section; without one the source is
/// returned as is. Only line breaks are trimmed from the kept content.
///
/// A body ending in an unterminated code fence gets a closing fence before
/// the section. `None` when the section would still not parse as a
/// top-level `heading` block (an unterminated HTML block, or a `block`
/// that does not open with `heading`).
#[must_use]
pub fn render_backlinks(document: &NoteDocument, block: &str, heading: &str) -> Option<String> {
    let source = document.source();
    let sentinel = document.sentinel_offset(heading);
    if sentinel.is_none() && block.is_empty() {
        return Some(source.to_string());
    }

    let head = trim_line_breaks(sentinel.map_or(source, |offset| &source[..offset]));
    if block.is_empty() {
        let mut out = head.to_string();
        if !out.is_empty() {
            out.push('\n');
        }
        return Some(out);
    }

    let (rendered, offset) = append_section(head, block);
    if opens_section_at(&rendered, offset, heading) {
        return Some(rendered);
    }

    let fence = NoteDocument::parse(head).trailing_fence()?;
    let (rendered, offset) = append_section(&format!("{head}\n{fence}"), block);
    opens_section_at(&rendered, offset, heading).then_some(rendered)
}

/// Regenerate the backlinks section of `note` on disk, then record the new
/// checksum and clear `needs_refresh`.
///
/// The caller checks for content drift first. A [`SyncOutcome::Skipped`]
/// note keeps its flag and checksum.
///
/// # Errors
///
/// [`NoteLinksError::Io`] when the note cannot be read or written.
pub fn synchronize_note(note: &mut Note, heading: &str) -> Result<SyncOutcome, NoteLinksError> {
    let io_err = |path: &Path, source| NoteLinksError::Io {
        path: path.to_path_buf(),
        source,
    };
    let current = std::fs::read_to_string(&note.path).map_err(|e| io_err(&note.path, e))?;
    let document = NoteDocument::parse(current);
    let Some(rendered) = render_backlinks(&document, &note.backlinks_block(heading), heading)
    else {
        warn!("{note}: no place for a top-level \"{heading}\" section; leaving it alone");
        return Ok(SyncOutcome::Skipped);
    };

    let outcome = if rendered == document.source() {
        SyncOutcome::Unchanged
    } else {
        std::fs::write(&note.path, &rendered).map_err(|e| io_err(&note.path, e))?;
        let written = std::fs::metadata(&note.path)
            .and_then(|meta| meta.modified())
            .map_err(|e| io_err(&note.path, e))?;
        note.synchronized_mtime = Some(DateTime::<Utc>::from(written));
        SyncOutcome::Rewritten
    };
    debug!("synchronized {note}: {outcome:?}");

    note.checksum = Some(sha256_hex(rendered.as_bytes()));
    note.needs_refresh = false;
    Ok(outcome)
}
