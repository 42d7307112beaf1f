use crate::core::record::ImageRecord;
use crate::error::{CurateError, Result};
use image::{DynamicImage, ImageReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tif", "tiff", "webp"];

pub const VIDEO_EXTENSIONS: &[&str] = &[
    "avi", "mp4", "mkv", "webm", "mpeg", "ogg", "m4v", "wmv", "mov", "flv",
];

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| allowed.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn is_image_file(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

pub fn is_video_file(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

/// Open and decode an image, keeping the path in the error.
pub fn open_image(path: &Path) -> Result<DynamicImage> {
    ImageReader::open(path)
        .map_err(|e| CurateError::io(path, e))?
        .with_guessed_format()
        .map_err(|e| CurateError::io(path, e))?
        .decode()
        .map_err(|e| CurateError::image(path, e))
}

/// List the images directly inside `dir`, sorted by file name.
///
/// The file-name order is the tie-break the duplicate resolver uses to pick
/// a survivor, so it is fixed here rather than left to the file system.
/// Subdirectories (including a previous run's `selects/` and `rejects/`),
/// symlinks and other non-regular files are skipped.
pub fn load_images(dir: &Path) -> Result<Vec<ImageRecord>> {
    if !dir.is_dir() {
        return Err(CurateError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let mut records = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if is_image_file(entry.path()) {
            records.push(ImageRecord::new(entry.into_path()));
        }
    }

    log::debug!("Found {} image(s) in {}", records.len(), dir.display());
    Ok(records)
}

/// Recursively collect source videos under `root`, sorted by path.
pub fn discover_videos(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(CurateError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let mut videos: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_video_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    videos.sort();
    Ok(videos)
}
