//! Runtime configuration: built-in defaults, optional YAML file, environment.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::NoteLinksError;

/// Overrides the directory holding persisted indexes.
pub const NOTELINKS_CACHE_HOME_ENV: &str = "NOTELINKS_CACHE_HOME";
const DEFAULT_EXTENSION: &str = "md";
const DEFAULT_BACKLINKS_HEADING: &str = "Backlinks";
const CACHE_DIR_NAME: &str = "omni-notelinks";

/// Resolved settings shared by scan and apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteLinksConfig {
    /// Note file extension without the dot.
    pub extension: String,
    /// Text of the level-2 heading that starts the generated section.
    pub backlinks_heading: String,
    /// Directory holding one persisted index per notes folder.
    pub cache_home: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NoteLinksConfigFile {
    extension: Option<String>,
    backlinks_heading: Option<String>,
    cache_home: Option<PathBuf>,
}

impl Default for NoteLinksConfig {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            backlinks_heading: DEFAULT_BACKLINKS_HEADING.to_string(),
            cache_home: default_cache_home(),
        }
    }
}

impl NoteLinksConfig {
    /// Defaults with a fixed cache directory (tests, embedding).
    #[must_use]
    pub fn with_cache_home(cache_home: impl Into<PathBuf>) -> Self {
        Self {
            cache_home: cache_home.into(),
            ..Self::default()
        }
    }

    /// Resolve configuration: defaults, then `config_file` (if given), then
    /// `NOTELINKS_CACHE_HOME`.
    ///
    /// # Errors
    ///
    /// Returns [`NoteLinksError::Config`] when the file cannot be read or is
    /// not valid YAML.
    pub fn resolve(config_file: Option<&Path>) -> Result<Self, NoteLinksError> {
        let mut config = Self::default();
        if let Some(path) = config_file {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                NoteLinksError::Config(format!("cannot read '{}': {e}", path.display()))
            })?;
            let file: NoteLinksConfigFile = serde_yaml::from_str(&raw).map_err(|e| {
                NoteLinksError::Config(format!("invalid config '{}': {e}", path.display()))
            })?;
            config.merge(file);
        }
        if let Some(cache_home) = env_path(NOTELINKS_CACHE_HOME_ENV) {
            config.cache_home = cache_home;
        }
        Ok(config)
    }

    fn merge(&mut self, file: NoteLinksConfigFile) {
        if let Some(extension) = non_empty(file.extension) {
            self.extension = extension.trim_start_matches('.').to_string();
        }
        if let Some(heading) = non_empty(file.backlinks_heading) {
            self.backlinks_heading = heading;
        }
        if let Some(cache_home) = file.cache_home {
            self.cache_home = cache_home;
        }
    }

    /// `.md` style suffix for file names and link targets.
    #[must_use]
    pub fn extension_suffix(&self) -> String {
        format!(".{}", self.extension)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_path(name: &str) -> Option<PathBuf> {
    let raw = std::env::var(name).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

fn default_cache_home() -> PathBuf {
    if let Some(cache_home) = env_path(NOTELINKS_CACHE_HOME_ENV) {
        return cache_home;
    }
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join(CACHE_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_overrides_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        let conf = tmp.path().join("notelinks.yaml");
        std::fs::write(
            &conf,
            "extension: .markdown\nbacklinks_heading: Linked From\ncache_home: /tmp/notelinks-cache\n",
        )?;

        let mut config = NoteLinksConfig::with_cache_home(tmp.path());
        let raw = std::fs::read_to_string(&conf)?;
        config.merge(serde_yaml::from_str(&raw)?);

        assert_eq!(config.extension, "markdown");
        assert_eq!(config.extension_suffix(), ".markdown");
        assert_eq!(config.backlinks_heading, "Linked From");
        assert_eq!(config.cache_home, PathBuf::from("/tmp/notelinks-cache"));
        Ok(())
    }

    #[test]
    fn test_blank_values_keep_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let mut config = NoteLinksConfig::with_cache_home("/cache");
        config.merge(serde_yaml::from_str("extension: ''\nbacklinks_heading: '  '\n")?);
        assert_eq!(config.extension, "md");
        assert_eq!(config.backlinks_heading, "Backlinks");
        Ok(())
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let result = NoteLinksConfig::resolve(Some(Path::new("/nonexistent/notelinks.yaml")));
        assert!(matches!(result, Err(NoteLinksError::Config(_))));
    }
}
