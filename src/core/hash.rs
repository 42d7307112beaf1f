use crate::config::MAX_HASH_SIZE;
use crate::core::loader::open_image;
use crate::core::record::{ImageRecord, ItemFailure};
use crate::error::{CurateError, Result};
use image::{DynamicImage, GrayImage};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::path::Path;

/// Difference hash over a `(hash_size + 1) × hash_size` luma grid.
///
/// Bit `i` of the result is set when cell `i` (row-major over the
/// `hash_size × hash_size` comparisons) is strictly brighter than its
/// right-hand neighbour.
#[derive(Debug, Clone, Copy)]
pub struct DifferenceHasher {
    hash_size: u32,
}

impl DifferenceHasher {
    pub fn new(hash_size: u32) -> Result<Self> {
        if hash_size == 0 || hash_size > MAX_HASH_SIZE {
            return Err(CurateError::InvalidConfig {
                message: format!(
                    "hash_size must be between 1 and {}, got {}",
                    MAX_HASH_SIZE, hash_size
                ),
            });
        }
        Ok(Self { hash_size })
    }

    pub fn hash_size(&self) -> u32 {
        self.hash_size
    }

    pub fn hash_image(&self, image: &DynamicImage) -> u64 {
        self.hash_luma(&image.to_luma8())
    }

    pub fn hash_luma(&self, gray: &GrayImage) -> u64 {
        let size = self.hash_size as usize;
        let columns = size + 1;
        // Whole intensities, as an 8-bit resize would give; keeps flat
        // regions from picking up bits out of rounding noise.
        let grid: Vec<f64> = area_resize(gray, columns as u32, self.hash_size)
            .into_iter()
            .map(f64::round)
            .collect();

        let mut hash = 0u64;
        for row in 0..size {
            for col in 0..size {
                let left = grid[row * columns + col];
                let right = grid[row * columns + col + 1];
                if left > right {
                    hash |= 1 << (row * size + col);
                }
            }
        }
        hash
    }

    pub fn hash_path(&self, path: &Path) -> Result<u64> {
        let image = open_image(path)?;
        Ok(self.hash_image(&image))
    }
}

impl Default for DifferenceHasher {
    fn default() -> Self {
        Self {
            hash_size: crate::config::DEFAULT_HASH_SIZE,
        }
    }
}

/// Per output index, the source indices it covers and their weights.
/// Weights are the overlap length divided by the footprint, so each list
/// sums to one.
fn area_weights(src: u32, dst: u32) -> Vec<Vec<(usize, f64)>> {
    let scale = f64::from(src) / f64::from(dst);
    (0..dst)
        .map(|out| {
            let start = f64::from(out) * scale;
            let end = start + scale;
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src as usize);
            (first..last)
                .filter_map(|i| {
                    let overlap = end.min(i as f64 + 1.0) - start.max(i as f64);
                    (overlap > 0.0).then_some((i, overlap / scale))
                })
                .collect()
        })
        .collect()
}

/// Area-averaging resize; returns row-major cell means without rounding.
pub fn area_resize(gray: &GrayImage, width: u32, height: u32) -> Vec<f64> {
    let (src_w, src_h) = gray.dimensions();
    let x_weights = area_weights(src_w, width);
    let y_weights = area_weights(src_h, height);

    // Horizontal pass: one row of `width` cells per source row.
    let mut rows = vec![0.0f64; src_h as usize * width as usize];
    for y in 0..src_h {
        for (out_x, weights) in x_weights.iter().enumerate() {
            let value: f64 = weights
                .iter()
                .map(|&(x, w)| f64::from(gray.get_pixel(x as u32, y)[0]) * w)
                .sum();
            rows[y as usize * width as usize + out_x] = value;
        }
    }

    let mut grid = vec![0.0f64; width as usize * height as usize];
    for (out_y, weights) in y_weights.iter().enumerate() {
        for out_x in 0..width as usize {
            grid[out_y * width as usize + out_x] = weights
                .iter()
                .map(|&(y, w)| rows[y * width as usize + out_x] * w)
                .sum();
        }
    }
    grid
}

/// Hash every record in parallel, keeping input order.
///
/// Images that fail to open or decode are logged and returned as failures;
/// they take no further part in the run.
pub fn hash_records(
    records: Vec<ImageRecord>,
    hasher: &DifferenceHasher,
    progress: &ProgressBar,
) -> (Vec<ImageRecord>, Vec<ItemFailure>) {
    let results: Vec<(ImageRecord, Result<u64>)> = records
        .into_par_iter()
        .map(|record| {
            let hash = hasher.hash_path(&record.path);
            progress.inc(1);
            (record, hash)
        })
        .collect();

    let mut hashed = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (mut record, hash) in results {
        match hash {
            Ok(hash) => {
                record.hash = Some(hash);
                hashed.push(record);
            }
            Err(e) => {
                log::warn!("Skipping {}: {}", record.path.display(), e);
                failures.push(ItemFailure::new(&record.path, e));
            }
        }
    }
    (hashed, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures;
    use image::Luma;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_area_resize_averages_footprints() {
        let gray = GrayImage::from_fn(4, 1, |x, _| Luma([(x * 10) as u8]));
        assert_eq!(area_resize(&gray, 2, 1), vec![5.0, 25.0]);
    }

    #[test]
    fn test_area_resize_fractional_overlap() {
        // 3 -> 2 columns: each cell covers 1.5 source pixels.
        let gray = GrayImage::from_fn(3, 1, |x, _| Luma([[0, 30, 90][x as usize]]));
        let cells = area_resize(&gray, 2, 1);
        assert!((cells[0] - 10.0).abs() < 1e-9);
        assert!((cells[1] - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_area_resize_handles_upscaling() {
        let gray = GrayImage::from_fn(2, 2, |x, y| Luma([(x * 100 + y * 10) as u8]));
        let cells = area_resize(&gray, 4, 4);
        assert_eq!(cells.len(), 16);
        assert_eq!(cells[0], 0.0);
        assert_eq!(cells[3], 100.0);
        assert_eq!(cells[15], 110.0);
    }

    #[test]
    fn test_rejects_invalid_hash_size() {
        assert!(DifferenceHasher::new(0).is_err());
        assert!(DifferenceHasher::new(9).is_err());
        assert_eq!(DifferenceHasher::new(8).unwrap().hash_size(), 8);
    }

    #[test]
    fn test_hash_bit_layout() {
        let hasher = DifferenceHasher::default();
        assert_eq!(hasher.hash_luma(&fixtures::falling_ramp()), u64::MAX);
        assert_eq!(hasher.hash_luma(&fixtures::rising_ramp()), 0);
        assert_eq!(hasher.hash_luma(&fixtures::valley()), 0x0F0F_0F0F_0F0F_0F0F);
        assert_eq!(hasher.hash_luma(&fixtures::ridge()), 0xF0F0_F0F0_F0F0_F0F0);
    }

    #[test]
    fn test_smaller_hash_size_uses_fewer_bits() {
        let hasher = DifferenceHasher::new(4).unwrap();
        assert_eq!(hasher.hash_luma(&fixtures::falling_ramp()), 0xFFFF);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let hasher = DifferenceHasher::default();
        let image = fixtures::gaussian_blurred(&fixtures::ridge(), 8.0);
        assert_eq!(hasher.hash_luma(&image), hasher.hash_luma(&image));
    }

    #[test]
    fn test_flat_image_hashes_to_zero() {
        let hasher = DifferenceHasher::default();
        assert_eq!(hasher.hash_luma(&fixtures::flat(64, 128)), 0);
    }

    #[test]
    fn test_byte_identical_copies_hash_equal() {
        let temp_dir = TempDir::new().unwrap();
        let original = temp_dir.path().join("original.png");
        let copy = temp_dir.path().join("copy.png");
        fixtures::save(&fixtures::valley(), &original);
        fs::copy(&original, &copy).unwrap();

        let hasher = DifferenceHasher::default();
        assert_eq!(
            hasher.hash_path(&original).unwrap(),
            hasher.hash_path(&copy).unwrap()
        );
    }

    #[test]
    fn test_hash_records_skips_corrupt_files() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("a.png");
        let bad = temp_dir.path().join("b.png");
        fixtures::save(&fixtures::rising_ramp(), &good);
        fs::write(&bad, b"definitely not a png").unwrap();

        let records = vec![ImageRecord::new(good.clone()), ImageRecord::new(bad.clone())];
        let (hashed, failures) = hash_records(
            records,
            &DifferenceHasher::default(),
            &ProgressBar::hidden(),
        );

        assert_eq!(hashed.len(), 1);
        assert_eq!(hashed[0].path, good);
        assert_eq!(hashed[0].hash, Some(0));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path, bad);
    }

    #[test]
    fn test_hash_records_preserves_order() {
        let temp_dir = TempDir::new().unwrap();
        let mut records = Vec::new();
        for (name, image) in [
            ("a.png", fixtures::falling_ramp()),
            ("b.png", fixtures::rising_ramp()),
            ("c.png", fixtures::valley()),
        ] {
            let path = temp_dir.path().join(name);
            fixtures::save(&image, &path);
            records.push(ImageRecord::new(path));
        }

        let (hashed, failures) = hash_records(
            records,
            &DifferenceHasher::default(),
            &ProgressBar::hidden(),
        );
        assert!(failures.is_empty());
        let hashes: Vec<_> = hashed.iter().map(|r| r.hash.unwrap()).collect();
        assert_eq!(hashes, vec![u64::MAX, 0, 0x0F0F_0F0F_0F0F_0F0F]);
    }
}
