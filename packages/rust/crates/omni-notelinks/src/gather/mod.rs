//! Extraction pipeline: stages, their ordering contract, and the engine that
//! runs them across every note.
//!
//! Each stage runs over all notes before the next one starts. `Backlink`
//! needs every note's finished `ForwardLink` output, so this barrier is what
//! makes the graph consistent.

mod cache;
mod digest;
mod forward;
mod graph;
mod modified;
mod schedule;
mod title;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::config::NoteLinksConfig;
use crate::error::PipelineError;
use crate::store::NoteStore;

pub use self::cache::DocumentCache;
pub use self::forward::{extract_forward_links, is_link_to_another_note};
pub use self::schedule::IncrementalScheduler;

/// One unit of extraction logic with a declared prerequisite set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Stage {
    /// Refresh `last_modified` from the filesystem. Always first.
    ModifiedTime,
    /// Extract the note title.
    Title,
    /// Rebuild outgoing links from the note body.
    ForwardLink,
    /// Resolve forward links into backlinks and broken links.
    Backlink,
    /// Record notes without backlinks.
    Orphan,
    /// Record the content checksum.
    Checksum,
}

impl Stage {
    /// Declared execution order.
    pub const STANDARD_ORDER: [Self; 6] = [
        Self::ModifiedTime,
        Self::Title,
        Self::ForwardLink,
        Self::Backlink,
        Self::Orphan,
        Self::Checksum,
    ];

    /// Stable identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ModifiedTime => "ModifiedTime",
            Self::Title => "Title",
            Self::ForwardLink => "ForwardLink",
            Self::Backlink => "Backlink",
            Self::Orphan => "Orphan",
            Self::Checksum => "Checksum",
        }
    }

    /// Stages that must register before this one may run (direct edges).
    #[must_use]
    pub const fn prerequisites(self) -> &'static [Self] {
        match self {
            Self::ModifiedTime | Self::Checksum => &[],
            Self::Title => &[Self::ModifiedTime],
            Self::ForwardLink => &[Self::Title],
            Self::Backlink => &[Self::ForwardLink],
            Self::Orphan => &[Self::Backlink],
        }
    }

    /// Transitive closure of [`prerequisites`](Self::prerequisites).
    #[must_use]
    pub fn required(self) -> BTreeSet<Self> {
        let mut out = BTreeSet::new();
        let mut pending: Vec<Self> = self.prerequisites().to_vec();
        while let Some(stage) = pending.pop() {
            if out.insert(stage) {
                pending.extend_from_slice(stage.prerequisites());
            }
        }
        out
    }

    /// Whether this stage is skipped for unchanged notes on incremental runs.
    #[must_use]
    pub const fn is_incremental(self) -> bool {
        !matches!(self, Self::ModifiedTime)
    }

    fn order_violation(self, registered: &BTreeSet<Self>) -> Option<String> {
        if self == Self::ModifiedTime {
            let others: Vec<&str> = registered
                .iter()
                .filter(|stage| **stage != Self::ModifiedTime)
                .map(|stage| stage.as_str())
                .collect();
            return (!others.is_empty())
                .then(|| format!("must run first, but {} already ran", others.join(", ")));
        }
        let missing: Vec<&str> = self
            .required()
            .into_iter()
            .filter(|stage| !registered.contains(stage))
            .map(Self::as_str)
            .collect();
        (!missing.is_empty()).then(|| format!("requires {}", missing.join(", ")))
    }

    /// Whether this stage may run against `store` right now.
    #[must_use]
    pub fn validate_order(self, store: &NoteStore) -> bool {
        self.order_violation(store.registered_gatherers()).is_none()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-stage counters for progress reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    /// The stage.
    pub stage: Stage,
    /// Notes the stage ran against.
    pub processed: usize,
    /// Notes skipped by the incremental scheduler.
    pub skipped: usize,
    /// Notes where the stage found something (a title, a forward link, ...).
    pub matched: usize,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    /// Counters in execution order.
    pub stages: Vec<StageReport>,
    /// Notes newly flagged as needing synchronization.
    pub flagged: usize,
}

impl PipelineReport {
    /// Counters for `stage`, if it ran.
    #[must_use]
    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|row| row.stage == stage)
    }
}

/// Mutable state handed to stage implementations.
pub(crate) struct StageContext<'p> {
    pub config: &'p NoteLinksConfig,
    pub documents: &'p mut DocumentCache,
    pub now: DateTime<Utc>,
}

/// Runs stages in declared order over all notes of a store.
#[derive(Debug)]
pub struct Pipeline {
    stages: Vec<Stage>,
    config: NoteLinksConfig,
    documents: DocumentCache,
}

impl Pipeline {
    /// Pipeline with the standard stage order.
    #[must_use]
    pub fn new(config: NoteLinksConfig) -> Self {
        Self::with_stages(config, Stage::STANDARD_ORDER.to_vec())
    }

    /// Pipeline with an explicit stage list; ordering is still validated at
    /// run time.
    #[must_use]
    pub fn with_stages(config: NoteLinksConfig, stages: Vec<Stage>) -> Self {
        Self {
            stages,
            config,
            documents: DocumentCache::default(),
        }
    }

    /// Configured stages.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run every stage across the store, then flag stale notes for refresh.
    ///
    /// # Errors
    ///
    /// Any stage failure aborts the run. Notes already mutated in memory are
    /// not rolled back; the caller must not persist the store.
    pub fn run(&mut self, store: &mut NoteStore) -> Result<PipelineReport, PipelineError> {
        let now = Utc::now();
        let scheduler = IncrementalScheduler::for_store(store);
        store.clear_gatherers();
        store.set_scan_time(now);
        self.documents.clear();

        let mut report = PipelineReport::default();

        let stages = self.stages.clone();
        for stage in stages {
            self.enter(stage, store)?;

            // decided at the barrier: bumps made during this stage only
            // affect later stages
            let targets: Vec<usize> = store
                .iter()
                .enumerate()
                .filter(|(_, note)| scheduler.should_run(stage, note))
                .map(|(index, _)| index)
                .collect();
            let skipped = store.len() - targets.len();

            let mut matched = 0usize;
            for &index in &targets {
                if self.apply(stage, store, index, now)? {
                    matched += 1;
                }
            }
            debug!(
                "stage {stage}: processed={} skipped={skipped} matched={matched}",
                targets.len()
            );
            report.stages.push(StageReport {
                stage,
                processed: targets.len(),
                skipped,
                matched,
            });
        }

        for note in store.notes_mut() {
            if scheduler.is_stale(note) && !note.needs_refresh {
                note.needs_refresh = true;
                report.flagged += 1;
            }
            note.mark_indexed();
        }

        store.clear_gatherers();
        self.documents.clear();
        info!(
            "indexed {} notes ({} newly flagged for backlink refresh)",
            store.len(),
            report.flagged
        );
        Ok(report)
    }

    /// Run a single stage against the note at `index`: validate ordering,
    /// register the stage, apply it. Returns whether the stage found anything.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Ordering`] before any mutation when prerequisites
    /// have not run; otherwise whatever the stage raises.
    pub fn run_stage(
        &mut self,
        stage: Stage,
        store: &mut NoteStore,
        index: usize,
    ) -> Result<bool, PipelineError> {
        if store.get(index).is_none() {
            return Err(PipelineError::UnknownNote(index));
        }
        self.enter(stage, store)?;
        self.apply(stage, store, index, Utc::now())
    }

    fn enter(&self, stage: Stage, store: &mut NoteStore) -> Result<(), PipelineError> {
        if let Some(reason) = stage.order_violation(store.registered_gatherers()) {
            return Err(PipelineError::Ordering { stage, reason });
        }
        store.register_gatherer(stage);
        Ok(())
    }

    fn apply(
        &mut self,
        stage: Stage,
        store: &mut NoteStore,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<bool, PipelineError> {
        let mut ctx = StageContext {
            config: &self.config,
            documents: &mut self.documents,
            now,
        };
        match stage {
            Stage::ModifiedTime => modified::apply(store, index),
            Stage::Title => title::apply(&mut ctx, store, index),
            Stage::ForwardLink => forward::apply(&mut ctx, store, index),
            Stage::Backlink => graph::apply_backlinks(store, index),
            Stage::Orphan => graph::apply_orphan(store, index),
            Stage::Checksum => digest::apply(&mut ctx, store, index),
        }
    }
}

pub(crate) fn note_mut(
    store: &mut NoteStore,
    index: usize,
) -> Result<&mut crate::note::Note, PipelineError> {
    store
        .get_mut(index)
        .ok_or(PipelineError::UnknownNote(index))
}
