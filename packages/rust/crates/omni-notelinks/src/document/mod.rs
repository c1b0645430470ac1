//! Markdown document model for notes.
//!
//! A [`NoteDocument`] owns the note source and a flattened depth-first walk
//! of its comrak AST, so it can be cached between stages without holding on
//! to a parse arena.

mod frontmatter;
mod walk;

use serde_yaml::Value;

use self::frontmatter::{frontmatter_title, split_frontmatter};
use self::walk::walk_markdown;

pub use self::walk::{Ancestor, ElementKind, SourceSpan, VisitedElement};

/// Parsed note: source text, optional front matter, and AST walk of the body.
#[derive(Debug, Clone)]
pub struct NoteDocument {
    source: String,
    body_start: usize,
    frontmatter: Option<Value>,
    elements: Vec<VisitedElement>,
}

impl NoteDocument {
    /// Parse a note's full content.
    #[must_use]
    pub fn parse(source: impl Into<String>) -> Self {
        let source = source.into();
        let (frontmatter, body_start) = split_frontmatter(&source);
        let elements = walk_markdown(&source[body_start..]);
        Self {
            source,
            body_start,
            frontmatter,
            elements,
        }
    }

    /// Full note content, front matter included.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Markdown body (content after the front matter block).
    #[must_use]
    pub fn body(&self) -> &str {
        &self.source[self.body_start..]
    }

    /// Depth-first element sequence with ancestor paths.
    #[must_use]
    pub fn elements(&self) -> &[VisitedElement] {
        &self.elements
    }

    /// Front matter `title`, else the first top-level H1.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        if let Some(title) = frontmatter_title(self.frontmatter.as_ref()) {
            return Some(title);
        }
        self.elements.iter().find_map(|element| match &element.kind {
            ElementKind::Heading { level: 1, text } if element.path.is_empty() && !text.is_empty() => {
                Some(text.clone())
            }
            _ => None,
        })
    }

    /// Position of the first top-level level-2 heading titled `heading`.
    /// Headings nested in quotes or lists never open the section.
    #[must_use]
    pub fn sentinel_position(&self, heading: &str) -> Option<usize> {
        self.elements
            .iter()
            .position(|element| element.is_sentinel(heading))
    }

    /// Byte offset into [`source`](Self::source) where the sentinel heading
    /// starts.
    #[must_use]
    pub fn sentinel_offset(&self, heading: &str) -> Option<usize> {
        let position = self.sentinel_position(heading)?;
        let line = self.elements[position].span.start_line;
        Some(self.body_start + line_offset(self.body(), line))
    }

    /// Closing fence for the last top-level block when that block is fenced
    /// code, e.g. `` ``` `` or `~~~~`.
    #[must_use]
    pub fn trailing_fence(&self) -> Option<String> {
        let last = self.elements.iter().rev().find(|e| e.is_top_level())?;
        match last.kind {
            ElementKind::CodeFence {
                fence_char,
                fence_length,
            } => Some(char::from(fence_char).to_string().repeat(fence_length)),
            _ => None,
        }
    }

    /// Source text covered by `span`, or `None` when the span falls outside
    /// the body.
    #[must_use]
    pub fn span_text(&self, span: SourceSpan) -> Option<String> {
        if span.start_line == 0 || span.end_line < span.start_line {
            return None;
        }
        let lines: Vec<&str> = self.body().lines().collect();
        let selected = lines.get(span.start_line - 1..span.end_line)?;
        let last = selected.len().saturating_sub(1);

        let mut parts: Vec<&str> = Vec::with_capacity(selected.len());
        for (offset, line) in selected.iter().enumerate() {
            let mut text: &str = line;
            if offset == last && span.end_column > 0 {
                text = text.get(..span.end_column).unwrap_or(text);
            }
            if offset == 0 && span.start_column > 0 {
                text = text.get(span.start_column - 1..).unwrap_or(text);
            }
            parts.push(text);
        }
        Some(parts.join("\n"))
    }

    /// Text of the block that encloses `element`, used as link context.
    #[must_use]
    pub fn enclosing_block_text(&self, element: &VisitedElement) -> String {
        element
            .enclosing_block_span()
            .and_then(|span| self.span_text(span))
            .unwrap_or_default()
    }
}

/// Byte offset of the start of 1-based `line` in `text`.
fn line_offset(text: &str, line: usize) -> usize {
    text.split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum()
}
