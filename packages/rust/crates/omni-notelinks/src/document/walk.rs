use comrak::{
    Arena, Options,
    nodes::{AstNode, NodeValue, Sourcepos},
    parse_document,
};

/// 1-based line/column range of a node in the parsed body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceSpan {
    /// First line (1-based).
    pub start_line: usize,
    /// First column on `start_line` (1-based, bytes).
    pub start_column: usize,
    /// Last line (1-based, inclusive).
    pub end_line: usize,
    /// Last column on `end_line` (1-based, bytes, inclusive).
    pub end_column: usize,
}

impl From<&Sourcepos> for SourceSpan {
    fn from(pos: &Sourcepos) -> Self {
        Self {
            start_line: pos.start.line,
            start_column: pos.start.column,
            end_line: pos.end.line,
            end_column: pos.end.column,
        }
    }
}

/// Element classification needed by link extraction and synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    /// ATX or setext heading with its plain text.
    Heading {
        /// Heading level (1-6).
        level: u8,
        /// Plain text content.
        text: String,
    },
    /// Inline hyperlink with its target as written.
    Link {
        /// Link URL/target.
        target: String,
    },
    /// Fenced code block and the fence that opened it.
    CodeFence {
        /// Fence character (`` ` `` or `~`).
        fence_char: u8,
        /// Number of fence characters.
        fence_length: usize,
    },
    /// Anything else.
    Other,
}

/// One step of the ancestor path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ancestor {
    /// Source span of the ancestor.
    pub span: SourceSpan,
    /// Whether the ancestor is a block (paragraph, list item, heading, ...).
    pub block: bool,
}

/// An element yielded by the depth-first walk, with the ancestors from the
/// top-level block down to its immediate parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitedElement {
    /// Classification of the element.
    pub kind: ElementKind,
    /// Source span of the element.
    pub span: SourceSpan,
    /// Ancestors, outermost first. Empty for top-level blocks.
    pub path: Vec<Ancestor>,
}

impl VisitedElement {
    /// Whether this element is a heading at `level` whose text equals `text`.
    #[must_use]
    pub fn is_heading(&self, level: u8, text: &str) -> bool {
        matches!(&self.kind, ElementKind::Heading { level: l, text: t } if *l == level && t == text)
    }

    /// Whether this element is a top-level block of the document.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.path.is_empty()
    }

    /// Whether this element opens the generated section titled `heading`:
    /// a level-2 heading directly under the document root.
    #[must_use]
    pub fn is_sentinel(&self, heading: &str) -> bool {
        self.is_top_level() && self.is_heading(2, heading)
    }

    /// Link target when this element is a hyperlink.
    #[must_use]
    pub fn link_target(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Link { target } => Some(target),
            _ => None,
        }
    }

    /// Span of the nearest enclosing block.
    #[must_use]
    pub fn enclosing_block_span(&self) -> Option<SourceSpan> {
        self.path
            .iter()
            .rev()
            .find(|ancestor| ancestor.block)
            .map(|ancestor| ancestor.span)
    }
}

fn parse_options() -> Options<'static> {
    let mut options = Options::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options
}

fn is_inline(value: &NodeValue) -> bool {
    matches!(
        value,
        NodeValue::Text(_)
            | NodeValue::Code(_)
            | NodeValue::Emph
            | NodeValue::Strong
            | NodeValue::Strikethrough
            | NodeValue::Link(_)
            | NodeValue::Image(_)
            | NodeValue::SoftBreak
            | NodeValue::LineBreak
            | NodeValue::HtmlInline(_)
    )
}

fn push_text_from_node<'a>(node: &'a AstNode<'a>, out: &mut String) {
    match &node.data.borrow().value {
        NodeValue::Text(value) => out.push_str(value),
        NodeValue::Code(value) => out.push_str(&value.literal),
        NodeValue::SoftBreak | NodeValue::LineBreak => out.push(' '),
        _ => {
            for child in node.children() {
                push_text_from_node(child, out);
            }
        }
    }
}

fn heading_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut out = String::new();
    for child in node.children() {
        push_text_from_node(child, &mut out);
    }
    out.trim().to_string()
}

fn visit<'a>(
    node: &'a AstNode<'a>,
    path: &mut Vec<Ancestor>,
    out: &mut Vec<VisitedElement>,
) {
    let (kind, span, block) = {
        let data = node.data.borrow();
        let kind = match &data.value {
            NodeValue::Heading(heading) => ElementKind::Heading {
                level: heading.level,
                text: heading_text(node),
            },
            NodeValue::Link(link) => ElementKind::Link {
                target: link.url.clone(),
            },
            NodeValue::CodeBlock(code) if code.fenced => ElementKind::CodeFence {
                fence_char: code.fence_char,
                fence_length: code.fence_length,
            },
            _ => ElementKind::Other,
        };
        (kind, SourceSpan::from(&data.sourcepos), !is_inline(&data.value))
    };

    out.push(VisitedElement {
        kind,
        span,
        path: path.clone(),
    });

    path.push(Ancestor { span, block });
    for child in node.children() {
        visit(child, path, out);
    }
    path.pop();
}

/// Parse a markdown body and flatten it into a depth-first element sequence.
pub(super) fn walk_markdown(body: &str) -> Vec<VisitedElement> {
    let arena = Arena::new();
    let root = parse_document(&arena, body, &parse_options());

    let mut out = Vec::new();
    let mut path = Vec::new();
    for child in root.children() {
        visit(child, &mut path, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_visits_in_document_order() {
        let elements = walk_markdown("# Title\n\nSee [b](b.md).\n\n## Backlinks\n");
        let headings: Vec<&ElementKind> = elements
            .iter()
            .map(|e| &e.kind)
            .filter(|k| matches!(k, ElementKind::Heading { .. }))
            .collect();
        assert_eq!(headings.len(), 2);

        let targets: Vec<&str> = elements.iter().filter_map(VisitedElement::link_target).collect();
        assert_eq!(targets, vec!["b.md"]);
        assert!(elements.iter().any(|e| e.is_heading(2, "Backlinks")));
    }

    #[test]
    fn test_link_path_reaches_enclosing_paragraph() {
        let elements = walk_markdown("Intro.\n\n- item with *stress [b](b.md)*\n");
        let Some(link) = elements.iter().find(|e| e.link_target().is_some()) else {
            panic!("link not found");
        };
        // list -> item -> paragraph -> emph
        assert_eq!(link.path.len(), 4);
        assert_eq!(link.path[0].span.start_line, 3);
        assert!(!link.path[3].block);
        assert!(link.path[2].block);
        assert_eq!(link.enclosing_block_span(), Some(link.path[2].span));
    }

    #[test]
    fn test_fenced_code_records_fence() {
        let elements = walk_markdown("text\n\n~~~~python\nprint()\n~~~~\n");
        assert!(elements.iter().any(|e| e.is_top_level()
            && e.kind
                == ElementKind::CodeFence {
                    fence_char: b'~',
                    fence_length: 4
                }));
    }

    #[test]
    fn test_heading_classification() {
        let elements = walk_markdown("## Backlinks\n\n### Backlinks\n");
        assert!(elements[0].is_heading(2, "Backlinks"));
        assert!(!elements.iter().skip(1).any(|e| e.is_heading(2, "Backlinks")));
    }
}
