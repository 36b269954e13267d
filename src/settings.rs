use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::categorizer::CategoryRuleSet;
use crate::error::{BudgitError, Result};
use crate::publish::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_dir_string")]
    pub data_dir: String,
    #[serde(default)]
    pub sheet_id: Option<String>,
    #[serde(default)]
    pub categories: CategoryRuleSet,
    /// Rows shown by the sorting view.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_publish_backoff_secs")]
    pub publish_backoff_secs: u64,
    #[serde(default = "default_publish_max_attempts")]
    pub publish_max_attempts: u32,
}

fn default_top_n() -> usize {
    50
}

fn default_publish_backoff_secs() -> u64 {
    60
}

fn default_publish_max_attempts() -> u32 {
    5
}

fn default_data_dir_string() -> String {
    default_data_dir().to_string_lossy().to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir_string(),
            sheet_id: None,
            categories: CategoryRuleSet::new(),
            top_n: default_top_n(),
            publish_backoff_secs: default_publish_backoff_secs(),
            publish_max_attempts: default_publish_max_attempts(),
        }
    }
}

impl Settings {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    /// Where statement exports are collected.
    pub fn csv_dir(&self) -> PathBuf {
        self.data_path().join("csv_files")
    }

    pub fn workbooks_dir(&self) -> PathBuf {
        self.data_path().join("workbooks")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            backoff: Duration::from_secs(self.publish_backoff_secs),
            max_attempts: self.publish_max_attempts.max(1),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("budgit")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("budgit")
}

/// `Ok(None)` when no settings file exists yet. An unreadable file is an
/// error, never silently replaced with defaults.
pub fn load_settings_from(path: &Path) -> Result<Option<Settings>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| BudgitError::CorruptSettings {
            path: path.to_path_buf(),
            source,
        })
}

pub fn load_settings() -> Result<Option<Settings>> {
    load_settings_from(&settings_path())
}

/// Settings for commands that can run before `init`: defaults when missing.
pub fn load_or_default() -> Result<Settings> {
    Ok(load_settings()?.unwrap_or_default())
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| BudgitError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&settings_path(), settings)
}

fn sheet_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/d/([A-Za-z0-9_-]+)").expect("valid regex"))
}

/// Extract the spreadsheet id from a sharing URL such as
/// `https://docs.google.com/spreadsheets/d/<id>/edit#gid=0`.
pub fn parse_sheet_id(url: &str) -> Result<String> {
    sheet_url_re()
        .captures(url.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| BudgitError::InvalidSheetUrl(url.trim().to_string()))
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = Settings {
            data_dir: "/tmp/test".to_string(),
            sheet_id: Some("abc123".to_string()),
            ..Settings::default()
        };
        settings.categories.add_trigger(Category::Car, "sunoco");
        save_settings_to(&path, &settings).unwrap();
        let loaded = load_settings_from(&path).unwrap().unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_settings_from(&dir.path().join("nope.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_corrupt_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_settings_from(&path).unwrap_err();
        assert!(matches!(err, BudgitError::CorruptSettings { .. }));
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"sheet_id": "xyz", "categories": {"Food": ["coffee"]}}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.top_n, 50);
        assert_eq!(s.publish_backoff_secs, 60);
        assert!(!s.data_dir.is_empty());
        assert_eq!(s.categories.triggers(Category::Food), ["coffee".to_string()]);
    }

    #[test]
    fn test_save_creates_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("nested").join("settings.json");
        save_settings_to(&path, &Settings::default()).unwrap();
        assert!(path.exists());
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.ends_with("}\n"));
    }

    #[test]
    fn test_parse_sheet_id() {
        assert_eq!(
            parse_sheet_id("https://docs.google.com/spreadsheets/d/1n-C8Ki2la_4q/edit#gid=0").unwrap(),
            "1n-C8Ki2la_4q"
        );
        assert!(parse_sheet_id("https://example.com/spreadsheets").is_err());
        assert!(parse_sheet_id("").is_err());
    }

    #[test]
    fn test_retry_policy_never_zero_attempts() {
        let s = Settings {
            publish_max_attempts: 0,
            ..Settings::default()
        };
        assert_eq!(s.retry_policy().max_attempts, 1);
    }
}
