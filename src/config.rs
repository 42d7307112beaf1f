use crate::error::{CurateError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_HASH_SIZE: u32 = 8;
pub const DEFAULT_BLUR_WINDOW: u32 = 60;
pub const DEFAULT_BLUR_THRESHOLD: f64 = 5.0;

/// Largest hash size whose `hash_size²` bits still fit a `u64`.
pub const MAX_HASH_SIZE: u32 = 8;

/// Options for one curation run.
///
/// Every field has a default, so a config file only needs the keys it wants
/// to change:
///
/// ```json
/// { "blur_threshold": 7.5, "overwrite": true }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurationConfig {
    /// Report what would happen without deleting or moving anything.
    pub dry_run: bool,
    pub deduplicate: bool,
    /// Score survivors and sort them into `selects/` and `rejects/blurry/`.
    pub remove_blurry: bool,
    pub hash_size: u32,
    /// Half-width of the low-frequency window removed before scoring.
    pub blur_window: u32,
    /// Mean log-magnitude at or below which an image is blurry.
    pub blur_threshold: f64,
    /// Reuse destination directories left by an earlier run.
    pub overwrite: bool,
    /// Where dry-run montages are written, if anywhere.
    pub montage_dir: Option<PathBuf>,
    #[serde(skip)]
    pub show_progress: bool,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            deduplicate: true,
            remove_blurry: true,
            hash_size: DEFAULT_HASH_SIZE,
            blur_window: DEFAULT_BLUR_WINDOW,
            blur_threshold: DEFAULT_BLUR_THRESHOLD,
            overwrite: false,
            montage_dir: None,
            show_progress: false,
        }
    }
}

impl CurationConfig {
    /// Load a JSON config file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| CurateError::io(path, e))?;
        let config: Self =
            serde_json::from_str(&raw).map_err(|source| CurateError::ConfigFile {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.hash_size == 0 || self.hash_size > MAX_HASH_SIZE {
            return Err(CurateError::InvalidConfig {
                message: format!(
                    "hash_size must be between 1 and {}, got {}",
                    MAX_HASH_SIZE, self.hash_size
                ),
            });
        }
        if self.blur_window == 0 {
            return Err(CurateError::InvalidConfig {
                message: "blur_window must be at least 1".to_string(),
            });
        }
        if !self.blur_threshold.is_finite() {
            return Err(CurateError::InvalidConfig {
                message: format!("blur_threshold must be finite, got {}", self.blur_threshold),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = CurationConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.dry_run);
        assert!(config.deduplicate);
        assert!(config.remove_blurry);
        assert_eq!(config.hash_size, 8);
        assert_eq!(config.blur_window, 60);
        assert_eq!(config.blur_threshold, 5.0);
    }

    #[test]
    fn test_rejects_hash_size_out_of_range() {
        for hash_size in [0, 9, 16] {
            let config = CurationConfig {
                hash_size,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(CurateError::InvalidConfig { .. })
            ));
        }
    }

    #[test]
    fn test_rejects_zero_window_and_nan_threshold() {
        let config = CurationConfig {
            blur_window: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CurationConfig {
            blur_threshold: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_keeps_defaults_for_missing_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("framecull.json");
        fs::write(&path, r#"{ "blur_threshold": 7.5, "dry_run": true }"#).unwrap();

        let config = CurationConfig::from_file(&path).unwrap();
        assert_eq!(config.blur_threshold, 7.5);
        assert!(config.dry_run);
        assert_eq!(config.hash_size, DEFAULT_HASH_SIZE);
        assert_eq!(config.blur_window, DEFAULT_BLUR_WINDOW);
    }

    #[test]
    fn test_from_file_reports_parse_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            CurationConfig::from_file(&path),
            Err(CurateError::ConfigFile { .. })
        ));
    }

    #[test]
    fn test_from_file_validates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.json");
        fs::write(&path, r#"{ "hash_size": 12 }"#).unwrap();

        assert!(matches!(
            CurationConfig::from_file(&path),
            Err(CurateError::InvalidConfig { .. })
        ));
    }
}
