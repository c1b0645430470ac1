use chrono::{DateTime, Utc};

use super::Stage;
use crate::note::Note;
use crate::store::NoteStore;

/// Decides which notes a stage re-examines on an incremental run.
///
/// The boundary is the earlier of the previous run's `scan_time` and
/// `use_time`, so a file saved while that run was in progress is still
/// newer than the boundary. Without a `use_time` (fresh or rebuilt index)
/// every stage processes every note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncrementalScheduler {
    boundary: Option<DateTime<Utc>>,
}

impl IncrementalScheduler {
    /// Scheduler with an explicit boundary.
    #[must_use]
    pub fn new(boundary: Option<DateTime<Utc>>) -> Self {
        Self { boundary }
    }

    /// Scheduler bounded by the run recorded in `store`. Call before the
    /// current run stamps its own `scan_time`.
    #[must_use]
    pub fn for_store(store: &NoteStore) -> Self {
        let boundary = store
            .use_time()
            .map(|use_time| store.scan_time().map_or(use_time, |scan| scan.min(use_time)));
        Self::new(boundary)
    }

    /// Whether `note` changed (or was invalidated) since the boundary.
    ///
    /// A note whose mtime is exactly the one left by the last backlinks
    /// rewrite is unchanged.
    #[must_use]
    pub fn is_stale(&self, note: &Note) -> bool {
        let Some(boundary) = self.boundary else {
            return true;
        };
        if note.is_discovered() {
            return true;
        }
        match note.last_modified {
            None => true,
            Some(last_modified) => {
                last_modified >= boundary && note.synchronized_mtime != Some(last_modified)
            }
        }
    }

    /// Whether `stage` should run against `note`.
    #[must_use]
    pub fn should_run(&self, stage: Stage, note: &Note) -> bool {
        !stage.is_incremental() || self.is_stale(note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn restored(last_modified: Option<DateTime<Utc>>) -> Note {
        let mut note = Note::restored("/notes/a.md".into());
        note.last_modified = last_modified;
        note
    }

    #[test]
    fn test_fresh_index_runs_everything() {
        let scheduler = IncrementalScheduler::new(None);
        let note = restored(Some(Utc::now() - Duration::days(30)));
        for stage in Stage::STANDARD_ORDER {
            assert!(scheduler.should_run(stage, &note));
        }
    }

    #[test]
    fn test_unchanged_note_only_refreshes_mtime() {
        let use_time = Utc::now();
        let scheduler = IncrementalScheduler::new(Some(use_time));
        let note = restored(Some(use_time - Duration::minutes(5)));

        assert!(scheduler.should_run(Stage::ModifiedTime, &note));
        for stage in Stage::STANDARD_ORDER.into_iter().skip(1) {
            assert!(!scheduler.should_run(stage, &note), "{stage} should skip");
        }
        assert!(!scheduler.is_stale(&note));
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let use_time = Utc::now();
        let scheduler = IncrementalScheduler::new(Some(use_time));
        assert!(scheduler.is_stale(&restored(Some(use_time))));
        assert!(scheduler.is_stale(&restored(None)));
    }

    #[test]
    fn test_discovered_note_is_stale() {
        let use_time = Utc::now();
        let scheduler = IncrementalScheduler::new(Some(use_time));
        let mut note = Note::new("/notes/new.md");
        note.last_modified = Some(use_time - Duration::days(1));
        assert!(scheduler.is_stale(&note));
    }

    #[test]
    fn test_boundary_is_earlier_of_scan_and_use_time() {
        let scan_time = Utc::now() - Duration::seconds(10);
        let mut store = NoteStore::new("/notes");
        store.set_scan_time(scan_time);
        store.set_use_time(Some(scan_time + Duration::seconds(5)));
        let scheduler = IncrementalScheduler::for_store(&store);

        // saved after the previous run started reading, before it was written
        assert!(scheduler.is_stale(&restored(Some(scan_time + Duration::seconds(2)))));
        assert!(!scheduler.is_stale(&restored(Some(scan_time - Duration::seconds(1)))));
    }

    #[test]
    fn test_own_rewrite_is_not_a_change() {
        let boundary = Utc::now() - Duration::minutes(1);
        let scheduler = IncrementalScheduler::new(Some(boundary));
        let rewritten = Utc::now();

        let mut note = restored(Some(rewritten));
        note.synchronized_mtime = Some(rewritten);
        assert!(!scheduler.is_stale(&note));

        note.last_modified = Some(rewritten + Duration::seconds(1));
        assert!(scheduler.is_stale(&note));
    }
}
