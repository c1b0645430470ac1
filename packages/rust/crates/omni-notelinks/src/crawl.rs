//! Note discovery: immediate children of the notes folder only.

use std::path::{Path, PathBuf};

/// List regular, non-hidden files in `dir` whose name ends with `suffix`
/// (for example `.md`), sorted by path. Sub-directories are not entered.
///
/// # Errors
///
/// Propagates the error from reading the directory itself; unreadable
/// entries are skipped.
pub fn discover_notes(dir: &Path, suffix: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)?.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') || !name.ends_with(suffix) || name.len() == suffix.len() {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_filters_by_extension() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        fs::write(tmp.path().join("b.md"), "# B")?;
        fs::write(tmp.path().join("a.md"), "# A")?;
        fs::write(tmp.path().join("notes.txt"), "plain")?;
        fs::write(tmp.path().join(".hidden.md"), "# Hidden")?;

        let files = discover_notes(tmp.path(), ".md")?;
        let names: Vec<String> = files
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        assert_eq!(names, vec!["a.md", "b.md"]);
        Ok(())
    }

    #[test]
    fn test_discover_is_not_recursive() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        fs::create_dir_all(tmp.path().join("nested"))?;
        fs::write(tmp.path().join("nested").join("deep.md"), "# Deep")?;
        fs::create_dir_all(tmp.path().join("folder.md"))?;
        fs::write(tmp.path().join("top.md"), "# Top")?;

        let files = discover_notes(tmp.path(), ".md")?;
        assert_eq!(files, vec![tmp.path().join("top.md")]);
        Ok(())
    }
}
