use crate::core::dataset::Dataset;
use crate::core::record::{ImageRecord, Verdict};
use crate::error::{CurateError, Result};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Copy `src` to a new file at `dest`, never touching an existing one.
///
/// The existence check runs first; the write itself uses `create_new` so a
/// file appearing in between is reported the same way. A failed copy removes
/// the partial file it created.
pub fn copy_exclusive(src: &Path, dest: &Path) -> Result<CreateOutcome> {
    if fs::symlink_metadata(dest).is_ok() {
        return Ok(CreateOutcome::AlreadyExists);
    }

    let mut input = File::open(src).map_err(|e| CurateError::io(src, e))?;
    let mut output = match OpenOptions::new().write(true).create_new(true).open(dest) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Ok(CreateOutcome::AlreadyExists);
        }
        Err(e) => return Err(CurateError::io(dest, e)),
    };

    if let Err(e) = io::copy(&mut input, &mut output).and_then(|_| output.sync_all()) {
        drop(output);
        if let Err(cleanup) = fs::remove_file(dest) {
            log::warn!("Failed to remove partial {}: {}", dest.display(), cleanup);
        }
        return Err(CurateError::io(dest, e));
    }
    Ok(CreateOutcome::Created)
}

/// Copy-then-delete move; works across devices.
pub fn move_exclusive(src: &Path, dest: &Path) -> Result<CreateOutcome> {
    match copy_exclusive(src, dest)? {
        CreateOutcome::AlreadyExists => Ok(CreateOutcome::AlreadyExists),
        CreateOutcome::Created => {
            fs::remove_file(src).map_err(|e| CurateError::io(src, e))?;
            Ok(CreateOutcome::Created)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SortOutcome {
    /// Destination paths under `selects/`.
    pub selected: Vec<PathBuf>,
    /// Destination paths under `rejects/blurry/`.
    pub rejected_blurry: Vec<PathBuf>,
}

/// Relocates scored records into the dataset's output tree.
pub struct DatasetSorter<'a> {
    dataset: &'a Dataset,
    dry_run: bool,
}

impl<'a> DatasetSorter<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn destination(&self, record: &ImageRecord, verdict: Verdict) -> PathBuf {
        let name = record.path.file_name().unwrap_or_default();
        self.dataset.destination_dir(verdict).join(name)
    }

    /// Move every scored record. A name collision at the destination stops
    /// the run with `DestinationCollision`; files moved before it stay moved.
    pub fn sort(&self, records: Vec<ImageRecord>) -> Result<SortOutcome> {
        let mut outcome = SortOutcome::default();

        for record in records {
            let Some(verdict) = record.verdict else {
                log::warn!("{} has no verdict; leaving it in place", record.path.display());
                continue;
            };
            let dest = self.destination(&record, verdict);

            if self.dry_run {
                if fs::symlink_metadata(&dest).is_ok() {
                    log::error!(
                        "[dry-run] {} already exists; sorting {} would fail",
                        dest.display(),
                        record.path.display()
                    );
                    return Err(CurateError::DestinationCollision { path: dest });
                }
                log::info!(
                    "[dry-run] would move {} → {}",
                    record.path.display(),
                    dest.display()
                );
            } else {
                match move_exclusive(&record.path, &dest)? {
                    CreateOutcome::Created => {
                        log::debug!("Moved {} → {}", record.path.display(), dest.display());
                    }
                    CreateOutcome::AlreadyExists => {
                        log::error!(
                            "Refusing to overwrite {} while sorting {}",
                            dest.display(),
                            record.path.display()
                        );
                        return Err(CurateError::DestinationCollision { path: dest });
                    }
                }
            }

            match verdict {
                Verdict::Sharp => outcome.selected.push(dest),
                Verdict::Blurry => outcome.rejected_blurry.push(dest),
            }
        }

        Ok(outcome)
    }
}
