use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Sharp,
    Blurry,
}

/// One discovered image as it moves through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRecord {
    pub path: PathBuf,
    /// File name captured at load time; the order every stage agrees on.
    pub sort_key: String,
    pub hash: Option<u64>,
    pub blur_score: Option<f64>,
    pub verdict: Option<Verdict>,
}

impl ImageRecord {
    pub fn new(path: PathBuf) -> Self {
        let sort_key = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        Self {
            path,
            sort_key,
            hash: None,
            blur_score: None,
            verdict: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// An image (or file) a stage gave up on without aborting the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl ItemFailure {
    pub fn new(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
