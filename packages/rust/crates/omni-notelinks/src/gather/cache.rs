use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::document::NoteDocument;
use crate::error::PipelineError;

/// Parsed notes for the duration of one pipeline run.
#[derive(Debug, Default)]
pub struct DocumentCache {
    documents: HashMap<PathBuf, Arc<NoteDocument>>,
}

impl DocumentCache {
    /// Parsed document for `path`, reading and parsing it on first access.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Io`] when the file cannot be read.
    pub fn load(&mut self, path: &Path) -> Result<Arc<NoteDocument>, PipelineError> {
        if let Some(document) = self.documents.get(path) {
            return Ok(Arc::clone(document));
        }
        let source = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = Arc::new(NoteDocument::parse(source));
        self.documents
            .insert(path.to_path_buf(), Arc::clone(&document));
        Ok(document)
    }

    /// Number of cached documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Drop every cached document.
    pub fn clear(&mut self) {
        self.documents.clear();
    }
}
