use crate::core::record::Verdict;
use crate::error::{CurateError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const SELECTS_DIR: &str = "selects";
pub const REJECTS_DIR: &str = "rejects";
pub const BLURRY_DIR: &str = "blurry";

/// Directory layout of one curation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    root: PathBuf,
    selects_dir: PathBuf,
    rejects_dir: PathBuf,
    blurry_dir: PathBuf,
}

impl Dataset {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let selects_dir = root.join(SELECTS_DIR);
        let rejects_dir = root.join(REJECTS_DIR);
        let blurry_dir = rejects_dir.join(BLURRY_DIR);
        Self {
            root,
            selects_dir,
            rejects_dir,
            blurry_dir,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn selects_dir(&self) -> &Path {
        &self.selects_dir
    }

    pub fn rejects_dir(&self) -> &Path {
        &self.rejects_dir
    }

    pub fn blurry_dir(&self) -> &Path {
        &self.blurry_dir
    }

    pub fn destination_dir(&self, verdict: Verdict) -> &Path {
        match verdict {
            Verdict::Sharp => &self.selects_dir,
            Verdict::Blurry => &self.blurry_dir,
        }
    }

    /// Fail the way `prepare` would, without creating anything.
    ///
    /// Any destination directory left over from an earlier run is an error
    /// unless `overwrite` is set, in which case existing directories are
    /// reused as they are.
    pub fn check(&self, overwrite: bool) -> Result<()> {
        for dir in [&self.selects_dir, &self.rejects_dir, &self.blurry_dir] {
            if fs::symlink_metadata(dir).is_ok() {
                if !overwrite {
                    return Err(CurateError::DestinationExists { path: dir.clone() });
                }
                if !dir.is_dir() {
                    return Err(CurateError::CreateDir {
                        path: dir.clone(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::AlreadyExists,
                            "exists and is not a directory",
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Create the output tree once at the start of a run, after [`check`].
    ///
    /// [`check`]: Dataset::check
    pub fn prepare(&self, overwrite: bool) -> Result<()> {
        self.check(overwrite)?;
        for dir in [&self.selects_dir, &self.blurry_dir] {
            fs::create_dir_all(dir).map_err(|source| CurateError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        log::debug!("Prepared output directories under {}", self.root.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout() {
        let dataset = Dataset::new("/data/run1");
        assert_eq!(dataset.root(), Path::new("/data/run1"));
        assert_eq!(dataset.selects_dir(), Path::new("/data/run1/selects"));
        assert_eq!(dataset.rejects_dir(), Path::new("/data/run1/rejects"));
        assert_eq!(dataset.blurry_dir(), Path::new("/data/run1/rejects/blurry"));
        assert_eq!(dataset.destination_dir(Verdict::Sharp), dataset.selects_dir());
        assert_eq!(dataset.destination_dir(Verdict::Blurry), dataset.blurry_dir());
    }

    #[test]
    fn test_prepare_creates_tree() {
        let temp_dir = TempDir::new().unwrap();
        let dataset = Dataset::new(temp_dir.path());
        dataset.prepare(false).unwrap();

        assert!(dataset.selects_dir().is_dir());
        assert!(dataset.rejects_dir().is_dir());
        assert!(dataset.blurry_dir().is_dir());
    }

    #[test]
    fn test_prepare_refuses_existing_tree_without_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("selects")).unwrap();
        let dataset = Dataset::new(temp_dir.path());

        let err = dataset.prepare(false).unwrap_err();
        assert!(matches!(err, CurateError::DestinationExists { ref path } if path == dataset.selects_dir()));
        assert!(!dataset.blurry_dir().exists());
    }

    #[test]
    fn test_prepare_is_idempotent_with_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let dataset = Dataset::new(temp_dir.path());
        dataset.prepare(false).unwrap();
        fs::write(dataset.selects_dir().join("kept.png"), b"x").unwrap();

        dataset.prepare(true).unwrap();
        assert!(dataset.selects_dir().join("kept.png").exists());
    }

    #[test]
    fn test_prepare_rejects_file_in_place_of_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("rejects"), b"not a dir").unwrap();
        let dataset = Dataset::new(temp_dir.path());

        assert!(matches!(
            dataset.prepare(true),
            Err(CurateError::CreateDir { .. })
        ));
    }

    #[test]
    fn test_check_reports_without_creating() {
        let temp_dir = TempDir::new().unwrap();
        let dataset = Dataset::new(temp_dir.path());

        dataset.check(false).unwrap();
        assert!(!dataset.selects_dir().exists());

        fs::create_dir_all(dataset.blurry_dir()).unwrap();
        assert!(matches!(
            dataset.check(false),
            Err(CurateError::DestinationExists { ref path }) if path == dataset.rejects_dir()
        ));
        dataset.check(true).unwrap();
        assert!(!dataset.selects_dir().exists());
    }

    #[test]
    fn test_prepare_fails_when_root_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("frames");
        fs::write(&root, b"not a dir").unwrap();
        let dataset = Dataset::new(&root);

        match dataset.prepare(false) {
            Err(CurateError::CreateDir { path, .. }) => assert_eq!(path, dataset.selects_dir()),
            other => panic!("expected CreateDir, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_prepare_fails_on_read_only_root() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("frames");
        fs::create_dir(&root).unwrap();
        fs::set_permissions(&root, fs::Permissions::from_mode(0o555)).unwrap();

        // Mode bits do not bind a privileged user.
        let writable = fs::write(root.join(".write_check"), b"").is_ok();
        let result = Dataset::new(&root).prepare(false);
        fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).unwrap();
        if writable {
            return;
        }

        assert!(matches!(result, Err(CurateError::CreateDir { .. })));
        assert!(!root.join("selects").exists());
    }
}
