use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FortifiError, Result};

pub const DEFAULT_SETTINGS_FILE: &str = ".fortifi";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_import_config_path")]
    pub import_config_path: String,
    #[serde(default = "default_raw_dir")]
    pub raw_dir: String,
}

fn default_database_path() -> String {
    "./FortiFi.db".to_string()
}

fn default_import_config_path() -> String {
    "./import_config.json".to_string()
}

fn default_raw_dir() -> String {
    "./raw".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            import_config_path: default_import_config_path(),
            raw_dir: default_raw_dir(),
        }
    }
}

impl Settings {
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(expand_home(&self.database_path))
    }

    pub fn import_config_path(&self) -> PathBuf {
        PathBuf::from(expand_home(&self.import_config_path))
    }

    pub fn raw_dir(&self) -> PathBuf {
        PathBuf::from(expand_home(&self.raw_dir))
    }
}

/// Missing file yields defaults; a file that exists but does not parse is an error.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| FortifiError::Config(format!("{}: {e}", path.display())))
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Normalises a user-entered database path: trims it and appends `.db` when absent.
pub fn normalize_db_path(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.ends_with(".db") {
        Some(trimmed.to_string())
    } else {
        Some(format!("{trimmed}.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_returns_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings(&dir.path().join(".fortifi")).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.database_path, "./FortiFi.db");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".fortifi");
        let settings = Settings {
            database_path: "/tmp/books.db".to_string(),
            ..Settings::default()
        };
        save_settings(&path, &settings).unwrap();
        let loaded = load_settings(&path).unwrap();
        assert_eq!(loaded.database_path, "/tmp/books.db");
        assert!(std::fs::read_to_string(&path).unwrap().ends_with("}\n"));
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".fortifi");
        std::fs::write(&path, r#"{"database_path": "other.db"}"#).unwrap();
        let s = load_settings(&path).unwrap();
        assert_eq!(s.database_path, "other.db");
        assert_eq!(s.raw_dir, "./raw");
        assert_eq!(s.import_config_path, "./import_config.json");
    }

    #[test]
    fn test_malformed_settings_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".fortifi");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_settings(&path), Err(FortifiError::Config(_))));
    }

    #[test]
    fn test_normalize_db_path() {
        assert_eq!(normalize_db_path(" finances "), Some("finances.db".to_string()));
        assert_eq!(normalize_db_path("a/b.db"), Some("a/b.db".to_string()));
        assert_eq!(normalize_db_path("   "), None);
    }

    #[test]
    fn test_expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("./FortiFi.db"), "./FortiFi.db");
    }
}
