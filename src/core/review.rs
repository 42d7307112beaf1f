use crate::core::loader::open_image;
use crate::error::{CurateError, Result};
use image::{RgbImage, imageops::FilterType};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

pub const MONTAGE_TILE: u32 = 150;

/// One set of same-hash images handed over for review. The first member is
/// the image a real run keeps.
#[derive(Debug, Clone)]
pub struct DuplicateGroup<'a> {
    hash: u64,
    members: Vec<&'a Path>,
}

impl<'a> DuplicateGroup<'a> {
    /// `None` unless there is a kept image and at least one duplicate.
    pub fn new(hash: u64, members: Vec<&'a Path>) -> Option<Self> {
        (members.len() > 1).then_some(Self { hash, members })
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn members(&self) -> &[&'a Path] {
        &self.members
    }

    pub fn kept(&self) -> &Path {
        self.members[0]
    }

    pub fn duplicates(&self) -> &[&'a Path] {
        &self.members[1..]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewFlow {
    Continue,
    Stop,
}

/// Receives duplicate groups during a dry run instead of them being deleted.
pub trait DuplicateReviewer {
    fn review(&mut self, group: &DuplicateGroup<'_>) -> Result<ReviewFlow>;
}

/// Compute a blake3 digest of a file's bytes.
fn content_digest(path: &Path) -> Result<blake3::Hash> {
    let file = File::open(path).map_err(|e| CurateError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer).map_err(|e| CurateError::io(path, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hasher.finalize())
}

/// True when every member of the group has the same bytes on disk.
pub fn is_byte_identical(group: &DuplicateGroup<'_>) -> Result<bool> {
    let first = content_digest(group.kept())?;
    for path in group.duplicates() {
        if content_digest(path)? != first {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Textual report through the log.
#[derive(Debug, Default)]
pub struct LogReviewer {
    reviewed: usize,
}

impl LogReviewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reviewed(&self) -> usize {
        self.reviewed
    }
}

impl DuplicateReviewer for LogReviewer {
    fn review(&mut self, group: &DuplicateGroup<'_>) -> Result<ReviewFlow> {
        self.reviewed += 1;
        let identical = match is_byte_identical(group) {
            Ok(true) => "byte-identical",
            Ok(false) => "perceptual match",
            Err(e) => {
                log::warn!("Could not compare group contents: {}", e);
                "unverified"
            }
        };
        log::info!("Hash {:016x} ({}):", group.hash(), identical);
        log::info!("   keep  {}", group.kept().display());
        for dup in group.duplicates() {
            log::info!("   [dry-run] would delete {}", dup.display());
        }
        Ok(ReviewFlow::Continue)
    }
}

/// Writes one side-by-side PNG per group into `out_dir`.
#[derive(Debug)]
pub struct MontageReviewer {
    out_dir: PathBuf,
    written: Vec<PathBuf>,
}

impl MontageReviewer {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn montage_path(&self, hash: u64) -> PathBuf {
        self.out_dir.join(format!("montage_{:016x}.png", hash))
    }
}

/// Resize every readable member to a square tile and stack them left to right.
pub fn build_montage(paths: &[&Path], tile: u32) -> Option<RgbImage> {
    let tiles: Vec<RgbImage> = paths
        .iter()
        .filter_map(|path| match open_image(path) {
            Ok(image) => Some(image.resize_exact(tile, tile, FilterType::Triangle).to_rgb8()),
            Err(e) => {
                log::warn!("Leaving {} out of montage: {}", path.display(), e);
                None
            }
        })
        .collect();

    if tiles.is_empty() {
        return None;
    }

    let mut montage = RgbImage::new(tile * tiles.len() as u32, tile);
    for (i, tile_image) in tiles.iter().enumerate() {
        image::imageops::replace(&mut montage, tile_image, i as i64 * i64::from(tile), 0);
    }
    Some(montage)
}

impl DuplicateReviewer for MontageReviewer {
    fn review(&mut self, group: &DuplicateGroup<'_>) -> Result<ReviewFlow> {
        fs::create_dir_all(&self.out_dir).map_err(|source| CurateError::CreateDir {
            path: self.out_dir.clone(),
            source,
        })?;

        let Some(montage) = build_montage(group.members(), MONTAGE_TILE) else {
            log::warn!("No readable images for hash {:016x}", group.hash());
            return Ok(ReviewFlow::Continue);
        };

        let path = self.montage_path(group.hash());
        montage
            .save(&path)
            .map_err(|e| CurateError::image(&path, e))?;
        log::info!("Montage for {:016x} → {}", group.hash(), path.display());
        self.written.push(path);
        Ok(ReviewFlow::Continue)
    }
}

/// Fans one group out to several reviewers; stops if any of them does.
#[derive(Default)]
pub struct ReviewerChain {
    reviewers: Vec<Box<dyn DuplicateReviewer>>,
}

impl ReviewerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reviewer: Box<dyn DuplicateReviewer>) -> Self {
        self.reviewers.push(reviewer);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.reviewers.is_empty()
    }
}

impl DuplicateReviewer for ReviewerChain {
    fn review(&mut self, group: &DuplicateGroup<'_>) -> Result<ReviewFlow> {
        let mut flow = ReviewFlow::Continue;
        for reviewer in &mut self.reviewers {
            if reviewer.review(group)? == ReviewFlow::Stop {
                flow = ReviewFlow::Stop;
            }
        }
        Ok(flow)
    }
}

/// Waits for the operator after each group.
pub struct InteractiveReviewer<R> {
    inner: R,
}

impl<R: DuplicateReviewer> InteractiveReviewer<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: DuplicateReviewer> DuplicateReviewer for InteractiveReviewer<R> {
    fn review(&mut self, group: &DuplicateGroup<'_>) -> Result<ReviewFlow> {
        if self.inner.review(group)? == ReviewFlow::Stop {
            return Ok(ReviewFlow::Stop);
        }
        let next = dialoguer::Confirm::new()
            .with_prompt("Continue to the next duplicate group?")
            .default(true)
            .interact()
            .map_err(|e| CurateError::Review {
                message: e.to_string(),
            })?;
        Ok(if next {
            ReviewFlow::Continue
        } else {
            ReviewFlow::Stop
        })
    }
}
