use std::collections::BTreeSet;
use std::path::Path;

use super::{StageContext, note_mut};
use crate::config::NoteLinksConfig;
use crate::document::NoteDocument;
use crate::error::PipelineError;
use crate::note::NoteLink;
use crate::store::NoteStore;

/// Whether a link target written in `own_file_name` points at another note.
#[must_use]
pub fn is_link_to_another_note(target: &str, own_file_name: &str, suffix: &str) -> bool {
    target != own_file_name
        && target.ends_with(suffix)
        && !target.starts_with('.')
        && !target.contains("http")
}

/// Links from `document` to other notes, up to the generated backlinks
/// section.
#[must_use]
pub fn extract_forward_links(
    document: &NoteDocument,
    origin_path: &Path,
    origin_title: &str,
    config: &NoteLinksConfig,
) -> BTreeSet<NoteLink> {
    let own_file_name = origin_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let suffix = config.extension_suffix();

    let mut links = BTreeSet::new();
    for element in document.elements() {
        if element.is_sentinel(&config.backlinks_heading) {
            break;
        }
        let Some(target) = element.link_target() else {
            continue;
        };
        if !is_link_to_another_note(target, own_file_name, &suffix) {
            continue;
        }
        let context = document.enclosing_block_text(element);
        links.insert(NoteLink::new(origin_path, origin_title, &context, target));
    }
    links
}

/// Re-extract forward links, then invalidate every note this one linked to
/// before or links to now.
pub(super) fn apply(
    ctx: &mut StageContext<'_>,
    store: &mut NoteStore,
    index: usize,
) -> Result<bool, PipelineError> {
    let note = note_mut(store, index)?;
    let document = ctx.documents.load(&note.path)?;
    let extracted =
        extract_forward_links(&document, &note.path, &note.display_title(), ctx.config);
    let found = !extracted.is_empty();
    let previous = std::mem::replace(&mut note.forward_links, extracted);

    let destinations: BTreeSet<String> = previous
        .iter()
        .chain(note.forward_links.iter())
        .map(|link| link.destination_file_name.clone())
        .collect();

    for destination in destinations {
        let Some(position) = store.position(&destination)? else {
            continue;
        };
        if let Some(target) = store.get_mut(position) {
            target.backlinks.clear();
            target.last_modified = Some(ctx.now);
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links_of(source: &str) -> Vec<(String, String)> {
        let document = NoteDocument::parse(source);
        let config = NoteLinksConfig::with_cache_home("/cache");
        extract_forward_links(&document, Path::new("/notes/a.md"), "A", &config)
            .into_iter()
            .map(|link| (link.destination_file_name, link.origin_context))
            .collect()
    }

    #[test]
    fn test_qualifying_targets() {
        assert!(is_link_to_another_note("b.md", "a.md", ".md"));
        assert!(!is_link_to_another_note("a.md", "a.md", ".md"));
        assert!(!is_link_to_another_note("b.txt", "a.md", ".md"));
        assert!(!is_link_to_another_note(".hidden.md", "a.md", ".md"));
        assert!(!is_link_to_another_note("https://example.com/b.md", "a.md", ".md"));
    }

    #[test]
    fn test_extracts_context_of_parent_block() {
        let links = links_of("# A\n\nSee [B](b.md)\nfor more.\n\n[self](a.md) and [web](http://x.io/c.md)\n");
        assert_eq!(
            links,
            vec![("b.md".to_string(), "See [B](b.md) for more.".to_string())]
        );
    }

    #[test]
    fn test_stops_at_backlinks_section() {
        let links = links_of(
            "# A\n\nLink to [c](c.md).\n\n## Backlinks\n\n- [B](b.md)\n  - B mentions [a](a.md)\n",
        );
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].0, "c.md");
    }

    #[test]
    fn test_other_level_two_headings_do_not_stop() {
        let links = links_of("## Notes\n\n[b](b.md)\n\n### Backlinks\n\n[c](c.md)\n");
        let targets: Vec<&str> = links.iter().map(|(d, _)| d.as_str()).collect();
        assert_eq!(targets, vec!["b.md", "c.md"]);
    }

    #[test]
    fn test_quoted_backlinks_heading_does_not_stop() {
        let links = links_of("# A\n\n> ## Backlinks\n>\n> quoted [b](b.md)\n\nthen [c](c.md)\n");
        let targets: Vec<&str> = links.iter().map(|(d, _)| d.as_str()).collect();
        assert_eq!(targets, vec!["b.md", "c.md"]);
    }
}
