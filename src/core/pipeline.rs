use crate::config::CurationConfig;
use crate::core::blur::{BlurDetector, score_records};
use crate::core::dataset::Dataset;
use crate::core::duplicate::{ResolveMode, resolve_duplicates};
use crate::core::hash::{DifferenceHasher, hash_records};
use crate::core::loader::load_images;
use crate::core::record::ItemFailure;
use crate::core::review::{DuplicateReviewer, LogReviewer, MontageReviewer, ReviewerChain};
use crate::core::sorter::{DatasetSorter, SortOutcome};
use crate::error::Result;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// What one run did, in a form automation can parse.
#[derive(Debug, Clone, Serialize)]
pub struct CurationSummary {
    pub dataset: PathBuf,
    pub started_at: String,
    pub dry_run: bool,
    pub images_found: usize,
    pub duplicate_groups: usize,
    /// Deleted duplicates, or in a dry run the ones that would be.
    pub removed: Vec<PathBuf>,
    pub removal_failures: Vec<ItemFailure>,
    pub unreadable: Vec<ItemFailure>,
    pub sorted: SortOutcome,
    pub elapsed_ms: u128,
}

impl CurationSummary {
    pub fn duplicates_removed(&self) -> usize {
        self.removed.len()
    }

    pub fn selected(&self) -> usize {
        self.sorted.selected.len()
    }

    pub fn rejected_blurry(&self) -> usize {
        self.sorted.rejected_blurry.len()
    }
}

impl fmt::Display for CurationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.dry_run { "[dry-run] " } else { "" };
        writeln!(f, "{}Curated {}", prefix, self.dataset.display())?;
        writeln!(f, "   images found:      {}", self.images_found)?;
        writeln!(
            f,
            "   duplicates:        {} removed from {} group(s)",
            self.duplicates_removed(),
            self.duplicate_groups
        )?;
        writeln!(f, "   selects:           {}", self.selected())?;
        writeln!(f, "   rejects/blurry:    {}", self.rejected_blurry())?;
        if !self.unreadable.is_empty() {
            writeln!(f, "   unreadable:        {}", self.unreadable.len())?;
        }
        if !self.removal_failures.is_empty() {
            writeln!(f, "   failed deletions:  {}", self.removal_failures.len())?;
        }
        write!(f, "   took {:.2?}", Duration::from_millis(self.elapsed_ms as u64))
    }
}

/// Run `f()`, log how long it took (with `label`), and return its result.
pub fn benchmark<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let start = Instant::now();
    let result = f();
    log::debug!("{} took {:.2?}", label, start.elapsed());
    result
}

/// Log every group, and write a montage of it when `montage_dir` is set.
pub fn default_reviewer(config: &CurationConfig) -> ReviewerChain {
    let chain = ReviewerChain::new().with(Box::new(LogReviewer::new()));
    match &config.montage_dir {
        Some(dir) => chain.with(Box::new(MontageReviewer::new(dir))),
        None => chain,
    }
}

/// Sequences loading, hashing, duplicate resolution, blur scoring and
/// sorting over one dataset directory.
pub struct Curator {
    config: CurationConfig,
    reviewer: Box<dyn DuplicateReviewer>,
}

impl Curator {
    pub fn new(config: CurationConfig) -> Result<Self> {
        config.validate()?;
        let reviewer = Box::new(default_reviewer(&config));
        Ok(Self { config, reviewer })
    }

    /// Replace the dry-run reviewer.
    pub fn with_reviewer(mut self, reviewer: Box<dyn DuplicateReviewer>) -> Self {
        self.reviewer = reviewer;
        self
    }

    pub fn config(&self) -> &CurationConfig {
        &self.config
    }

    fn progress(&self, len: usize, message: &'static str) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} [{bar:30}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }

    pub fn run(&mut self, root: &Path) -> Result<CurationSummary> {
        let start = Instant::now();
        let started_at = Utc::now().to_rfc3339();
        let dry_run = self.config.dry_run;

        log::info!("Curating {}", root.display());
        let records = load_images(root)?;
        let images_found = records.len();
        log::info!("Found {} image(s)", images_found);

        let dataset = Dataset::new(root);
        if self.config.remove_blurry {
            if dry_run {
                dataset.check(self.config.overwrite)?;
            } else {
                dataset.prepare(self.config.overwrite)?;
            }
        }

        let mut unreadable = Vec::new();
        let mut removed = Vec::new();
        let mut removal_failures = Vec::new();
        let mut duplicate_groups = 0;

        let survivors = if self.config.deduplicate {
            let hasher = DifferenceHasher::new(self.config.hash_size)?;
            let bar = self.progress(records.len(), "Hashing");
            let (hashed, failures) =
                benchmark("hashing all images", || hash_records(records, &hasher, &bar));
            bar.finish_and_clear();
            unreadable.extend(failures);

            let mode = if dry_run {
                ResolveMode::DryRun
            } else {
                ResolveMode::Delete
            };
            let resolution = resolve_duplicates(hashed, mode, self.reviewer.as_mut());
            duplicate_groups = resolution.duplicate_groups;
            removed = resolution.removed;
            removal_failures = resolution.failures;
            resolution.survivors
        } else {
            records
        };

        let sorted = if self.config.remove_blurry {
            let detector = BlurDetector::new(self.config.blur_window, self.config.blur_threshold);
            let bar = self.progress(survivors.len(), "Scoring");
            let (scored, failures) =
                benchmark("scoring survivors", || score_records(survivors, &detector, &bar));
            bar.finish_and_clear();
            unreadable.extend(failures);

            DatasetSorter::new(&dataset).dry_run(dry_run).sort(scored)?
        } else {
            SortOutcome::default()
        };

        let summary = CurationSummary {
            dataset: root.to_path_buf(),
            started_at,
            dry_run,
            images_found,
            duplicate_groups,
            removed,
            removal_failures,
            unreadable,
            sorted,
            elapsed_ms: start.elapsed().as_millis(),
        };
        log::info!(
            "Done: {} duplicate(s) removed, {} selected, {} rejected as blurry",
            summary.duplicates_removed(),
            summary.selected(),
            summary.rejected_blurry()
        );
        Ok(summary)
    }
}
