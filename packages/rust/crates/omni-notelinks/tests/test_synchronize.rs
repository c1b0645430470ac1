//! Integration tests for `apply`: backlinks sections, idempotence, drift.

use chrono::Duration;
use omni_notelinks::{
    ApplyOptions, IndexLocation, NoteLinksConfig, NoteLinksError, NoteStore, ScanOptions, Stage,
    apply, scan,
};
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

struct Fixture {
    _tmp: TempDir,
    notes: PathBuf,
    config: NoteLinksConfig,
}

impl Fixture {
    fn scenario_a() -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_notes(&[
            ("a.md", "# A\n\nSee [B](b.md) for details.\n"),
            ("b.md", "# B\n\nNo links here.\n"),
            ("c.md", "# C\n\nPoints at [nothing](missing.md).\n"),
        ])
    }

    fn with_notes(files: &[(&str, &str)]) -> Result<Self, Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        let notes = tmp.path().join("notes");
        fs::create_dir(&notes)?;
        for (name, content) in files {
            fs::write(notes.join(name), content)?;
        }
        let config = NoteLinksConfig::with_cache_home(tmp.path().join("cache"));
        Ok(Self {
            _tmp: tmp,
            notes,
            config,
        })
    }

    fn read(&self, name: &str) -> Result<String, std::io::Error> {
        fs::read_to_string(self.notes.join(name))
    }

    fn store(&self) -> Result<NoteStore, Box<dyn std::error::Error>> {
        let location =
            IndexLocation::for_directory(&self.config.cache_home, &self.notes.canonicalize()?);
        Ok(NoteStore::load(&location)?.ok_or("index missing")?)
    }

    fn path(&self, name: &str) -> Result<PathBuf, std::io::Error> {
        Ok(self.notes.canonicalize()?.join(name))
    }
}

const B_WITH_BACKLINKS: &str =
    "# B\n\nNo links here.\n\n## Backlinks\n\n- [A](a.md)\n  - See [B](b.md) for details.\n";

#[test]
fn test_apply_writes_backlinks_section() -> TestResult {
    let fx = Fixture::scenario_a()?;
    scan(&fx.notes, &fx.config, ScanOptions::default())?;
    let report = apply(&fx.notes, &fx.config, ApplyOptions::default())?;

    assert_eq!(fx.read("b.md")?, B_WITH_BACKLINKS);
    assert_eq!(report.rewritten, vec![fx.path("b.md")?]);
    assert_eq!(report.unchanged.len(), 2);
    // notes without backlinks keep their bytes
    assert_eq!(fx.read("a.md")?, "# A\n\nSee [B](b.md) for details.\n");

    let store = fx.store()?;
    assert_eq!(store.needing_refresh().count(), 0);
    let b = store.search("b.md")?.ok_or("b.md missing")?;
    assert_eq!(
        b.checksum.as_deref(),
        Some(omni_notelinks::sha256_hex(B_WITH_BACKLINKS.as_bytes()).as_str())
    );
    Ok(())
}

#[test]
fn test_apply_is_idempotent() -> TestResult {
    let fx = Fixture::scenario_a()?;
    scan(&fx.notes, &fx.config, ScanOptions::default())?;
    apply(&fx.notes, &fx.config, ApplyOptions { all: true })?;
    let first = fx.read("b.md")?;

    let again = apply(&fx.notes, &fx.config, ApplyOptions { all: true })?;
    assert!(again.rewritten.is_empty());
    assert_eq!(again.unchanged.len(), 3);
    assert_eq!(fx.read("b.md")?, first);

    // a rescan after apply sees the generated section as generated
    let rescan = scan(&fx.notes, &fx.config, ScanOptions::default())?;
    assert!(rescan.needs_refresh.is_empty());
    assert!(fx.store()?.search("b.md")?.ok_or("b.md missing")?.forward_links.is_empty());
    Ok(())
}

#[test]
fn test_section_removed_after_origin_deleted() -> TestResult {
    let fx = Fixture::scenario_a()?;
    scan(&fx.notes, &fx.config, ScanOptions::default())?;
    apply(&fx.notes, &fx.config, ApplyOptions::default())?;
    assert_eq!(fx.read("b.md")?, B_WITH_BACKLINKS);

    fs::remove_file(fx.notes.join("a.md"))?;
    let report = scan(&fx.notes, &fx.config, ScanOptions::default())?;
    assert!(report.rebuilt);
    apply(&fx.notes, &fx.config, ApplyOptions::default())?;

    assert_eq!(fx.read("b.md")?, "# B\n\nNo links here.\n");
    Ok(())
}

#[test]
fn test_apply_without_scan_fails() -> TestResult {
    let fx = Fixture::scenario_a()?;
    let result = apply(&fx.notes, &fx.config, ApplyOptions::default());
    assert!(matches!(result, Err(NoteLinksError::NoIndex(_))));
    Ok(())
}

#[test]
fn test_drifted_note_is_not_overwritten() -> TestResult {
    let fx = Fixture::scenario_a()?;
    scan(&fx.notes, &fx.config, ScanOptions::default())?;
    let scanned = fx.store()?.use_time();
    let edited = "# B\n\nEdited after the scan.\n";
    fs::write(fx.notes.join("b.md"), edited)?;

    let result = apply(&fx.notes, &fx.config, ApplyOptions::default());
    let notes = match result {
        Err(NoteLinksError::ContentDrift { notes }) => notes,
        other => panic!("expected content drift, got {other:?}"),
    };
    assert_eq!(notes, vec![fx.path("b.md")?]);
    assert_eq!(fx.read("b.md")?, edited);

    let store = fx.store()?;
    assert!(store.search("b.md")?.ok_or("b.md missing")?.needs_refresh);
    assert_eq!(store.use_time(), scanned);

    scan(&fx.notes, &fx.config, ScanOptions::default())?;
    apply(&fx.notes, &fx.config, ApplyOptions::default())?;
    assert_eq!(
        fx.read("b.md")?,
        "# B\n\nEdited after the scan.\n\n## Backlinks\n\n- [A](a.md)\n  - See [B](b.md) for details.\n"
    );
    Ok(())
}

#[test]
fn test_custom_heading() -> TestResult {
    let fx = Fixture::scenario_a()?;
    let config = NoteLinksConfig {
        backlinks_heading: "Linked From".to_string(),
        ..fx.config.clone()
    };
    scan(&fx.notes, &config, ScanOptions::default())?;
    apply(&fx.notes, &config, ApplyOptions::default())?;
    let content = fx.read("b.md")?;
    assert!(content.contains("\n## Linked From\n\n- [A](a.md)\n"));
    assert!(!content.contains("## Backlinks"));
    Ok(())
}

#[test]
fn test_edit_after_apply_reaches_next_scan() -> TestResult {
    let fx = Fixture::with_notes(&[("a.md", "# A\n\nNo links.\n"), ("b.md", "# B\n")])?;
    scan(&fx.notes, &fx.config, ScanOptions::default())?;
    apply(&fx.notes, &fx.config, ApplyOptions::default())?;
    scan(&fx.notes, &fx.config, ScanOptions::default())?;
    let scanned = fx.store()?.use_time().ok_or("use_time missing")?;

    // saved after the scan, before the next apply
    let a = fx.notes.join("a.md");
    fs::write(&a, "# A\n\nNow see [b](b.md).\n")?;
    fs::File::options()
        .write(true)
        .open(&a)?
        .set_modified(SystemTime::from(scanned + Duration::milliseconds(1)))?;
    let idle = apply(&fx.notes, &fx.config, ApplyOptions::default())?;
    assert!(idle.rewritten.is_empty());
    assert_eq!(fx.store()?.use_time(), Some(scanned));

    let report = scan(&fx.notes, &fx.config, ScanOptions::default())?;
    let forward = report
        .stages
        .iter()
        .find(|row| row.stage == Stage::ForwardLink)
        .map(|row| row.processed);
    assert_eq!(forward, Some(1));
    assert_eq!(fx.store()?.search("b.md")?.ok_or("b.md missing")?.backlinks.len(), 1);

    apply(&fx.notes, &fx.config, ApplyOptions::default())?;
    assert_eq!(
        fx.read("b.md")?,
        "# B\n\n## Backlinks\n\n- [A](a.md)\n  - Now see [b](b.md).\n"
    );
    Ok(())
}

#[test]
fn test_note_ending_in_open_fence_gets_one_section() -> TestResult {
    let fx = Fixture::with_notes(&[
        ("a.md", "# A\n\nSee [b](b.md).\n"),
        ("b.md", "# B\n\n```\ncode\n"),
    ])?;
    scan(&fx.notes, &fx.config, ScanOptions::default())?;
    apply(&fx.notes, &fx.config, ApplyOptions::default())?;
    let first = fx.read("b.md")?;
    assert_eq!(
        first,
        "# B\n\n```\ncode\n```\n\n## Backlinks\n\n- [A](a.md)\n  - See [b](b.md).\n"
    );

    scan(&fx.notes, &fx.config, ScanOptions::default())?;
    let again = apply(&fx.notes, &fx.config, ApplyOptions { all: true })?;
    assert!(again.rewritten.is_empty());
    assert_eq!(fx.read("b.md")?, first);
    Ok(())
}
