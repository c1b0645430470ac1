//! omni-notelinks - Incremental backlink index for folders of markdown notes.
//!
//! Module layout:
//! - `note` / `store`: notes, links, and the index aggregate
//! - `document`: comrak-backed document model (front matter, AST walk)
//! - `gather`: extraction stages, ordering contract, incremental scheduler
//! - `persistence`: versioned on-disk index and external note view
//! - `synchronize`: idempotent rewrite of the generated backlinks section
//! - `workflow`: `scan` / `apply` / `notes`
//!
//! # Examples
//!
//! ```rust
//! use omni_notelinks::{Note, NoteLink, NoteStore};
//!
//! let mut store = NoteStore::new("/notes");
//! store.register(Note::new("/notes/a.md")).unwrap();
//! store.register(Note::new("/notes/b.md")).unwrap();
//! assert_eq!(store.to_string(), "NoteStore(size=2)");
//!
//! let link = NoteLink::new("/notes/a.md", "A", "see [b](b.md)", "b.md");
//! assert_eq!(link.to_string(), "a.md -> b.md");
//! assert!(store.search("b.md").unwrap().is_some());
//! ```

mod checksum;
pub mod config;
mod crawl;
pub mod document;
mod error;
pub mod gather;
mod note;
pub mod persistence;
mod store;
pub mod synchronize;
pub mod workflow;

pub use checksum::{sha256_file, sha256_hex};
pub use config::{NOTELINKS_CACHE_HOME_ENV, NoteLinksConfig};
pub use crawl::discover_notes;
pub use document::NoteDocument;
pub use error::{IndexError, NoteLinksError, PipelineError};
pub use gather::{
    DocumentCache, IncrementalScheduler, Pipeline, PipelineReport, Stage, StageReport,
    extract_forward_links, is_link_to_another_note,
};
pub use note::{Note, NoteLink};
pub use persistence::{INDEX_SCHEMA_VERSION, IndexLocation, LinkRecord, NoteView};
pub use store::NoteStore;
pub use synchronize::{SyncOutcome, render_backlinks, synchronize_note};
pub use workflow::{ApplyOptions, ApplyReport, ScanOptions, ScanReport, apply, notes, scan};

/// Initialize `env_logger` for command-line use (`RUST_LOG` overrides the
/// default `info` filter). Logs go to stderr.
pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();
}
