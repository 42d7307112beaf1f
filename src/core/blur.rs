use crate::config::{DEFAULT_BLUR_THRESHOLD, DEFAULT_BLUR_WINDOW};
use crate::core::loader::open_image;
use crate::core::record::{ImageRecord, ItemFailure, Verdict};
use crate::error::Result;
use image::{DynamicImage, GrayImage};
use indicatif::ProgressBar;
use rayon::prelude::*;
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use serde::Serialize;
use std::path::Path;

/// Smallest magnitude fed to the log. A pixel with no high-frequency energy
/// contributes `20 * log10(EPSILON)` instead of `-inf`.
pub const MAGNITUDE_FLOOR: f64 = f64::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlurScore {
    /// Mean log-magnitude of the high-pass reconstruction.
    pub mean: f64,
    pub verdict: Verdict,
    /// Half-width actually removed after clamping to the image size.
    pub window: u32,
}

/// Frequency-domain blur detector.
///
/// The low-frequency square around DC is removed from the centered
/// spectrum and the image is reconstructed from what is left. Sharp edges
/// leave energy there, blur does not, so the mean log-magnitude of the
/// reconstruction falls as an image gets softer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurDetector {
    window: u32,
    threshold: f64,
}

impl Default for BlurDetector {
    fn default() -> Self {
        Self::new(DEFAULT_BLUR_WINDOW, DEFAULT_BLUR_THRESHOLD)
    }
}

impl BlurDetector {
    pub fn new(window: u32, threshold: f64) -> Self {
        Self { window, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// The configured half-width, clamped to half the smaller dimension so
    /// the window never runs off the spectrum.
    pub fn effective_window(&self, width: u32, height: u32) -> u32 {
        self.window.min(width.min(height) / 2)
    }

    pub fn classify(&self, mean: f64) -> Verdict {
        if mean <= self.threshold {
            Verdict::Blurry
        } else {
            Verdict::Sharp
        }
    }

    pub fn score_luma(&self, gray: &GrayImage) -> BlurScore {
        let (width, height) = gray.dimensions();
        let window = self.effective_window(width, height);
        if window < self.window {
            log::debug!(
                "Blur window clamped from {} to {} for {}x{} image",
                self.window,
                window,
                width,
                height
            );
        }

        let (w, h) = (width as usize, height as usize);
        let mut spectrum: Vec<Complex<f64>> = gray
            .pixels()
            .map(|p| Complex::new(f64::from(p[0]), 0.0))
            .collect();

        let mut scratch = vec![Complex::new(0.0, 0.0); spectrum.len()];
        let mut planner = FftPlanner::new();
        fft2(&mut spectrum, &mut scratch, w, h, false, &mut planner);

        fft_shift(&mut spectrum, w, h);
        let (cx, cy) = (w / 2, h / 2);
        let s = window as usize;
        for y in (cy - s)..(cy + s) {
            spectrum[y * w + cx - s..y * w + cx + s].fill(Complex::new(0.0, 0.0));
        }
        ifft_shift(&mut spectrum, w, h);
        fft2(&mut spectrum, &mut scratch, w, h, true, &mut planner);
        let norm = (w * h) as f64;

        let total: f64 = spectrum
            .iter()
            .map(|z| 20.0 * (z.norm() / norm).max(MAGNITUDE_FLOOR).log10())
            .sum();
        let mean = total / norm;

        BlurScore {
            mean,
            verdict: self.classify(mean),
            window,
        }
    }

    pub fn score_image(&self, image: &DynamicImage) -> BlurScore {
        self.score_luma(&image.to_luma8())
    }

    pub fn score_path(&self, path: &Path) -> Result<BlurScore> {
        let image = open_image(path)?;
        Ok(self.score_image(&image))
    }
}

/// In-place 2-D DFT over a row-major `width × height` buffer. `scratch`
/// must be the same length and holds the transposed columns. The inverse
/// is left unnormalized, as `rustfft` returns it.
fn fft2(
    data: &mut [Complex<f64>],
    scratch: &mut [Complex<f64>],
    width: usize,
    height: usize,
    inverse: bool,
    planner: &mut FftPlanner<f64>,
) {
    let (row_fft, col_fft) = if inverse {
        (planner.plan_fft_inverse(width), planner.plan_fft_inverse(height))
    } else {
        (planner.plan_fft_forward(width), planner.plan_fft_forward(height))
    };

    // Buffer length is a multiple of the FFT length, so each row is
    // transformed in turn.
    row_fft.process(data);

    transpose_into(data, scratch, width, height);
    col_fft.process(scratch);
    transpose_into(scratch, data, height, width);
}

fn transpose_into(src: &[Complex<f64>], dst: &mut [Complex<f64>], width: usize, height: usize) {
    for y in 0..height {
        for x in 0..width {
            dst[x * height + y] = src[y * width + x];
        }
    }
}

/// Move the zero-frequency bin to `(width / 2, height / 2)`, in place.
fn fft_shift(data: &mut [Complex<f64>], width: usize, height: usize) {
    if width == 0 {
        return;
    }
    for row in data.chunks_exact_mut(width) {
        row.rotate_right(width / 2);
    }
    data.rotate_right((height / 2) * width);
}

/// Inverse of [`fft_shift`], also for odd dimensions.
fn ifft_shift(data: &mut [Complex<f64>], width: usize, height: usize) {
    if width == 0 {
        return;
    }
    for row in data.chunks_exact_mut(width) {
        row.rotate_left(width / 2);
    }
    data.rotate_left((height / 2) * width);
}

/// Score every record in parallel, keeping input order.
pub fn score_records(
    records: Vec<ImageRecord>,
    detector: &BlurDetector,
    progress: &ProgressBar,
) -> (Vec<ImageRecord>, Vec<ItemFailure>) {
    let results: Vec<(ImageRecord, Result<BlurScore>)> = records
        .into_par_iter()
        .map(|record| {
            let score = detector.score_path(&record.path);
            progress.inc(1);
            (record, score)
        })
        .collect();

    let mut scored = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (mut record, score) in results {
        match score {
            Ok(score) => {
                log::debug!(
                    "{} is {:?} ({:.2})",
                    record.sort_key,
                    score.verdict,
                    score.mean
                );
                record.blur_score = Some(score.mean);
                record.verdict = Some(score.verdict);
                scored.push(record);
            }
            Err(e) => {
                log::warn!("Skipping {}: {}", record.path.display(), e);
                failures.push(ItemFailure::new(&record.path, e));
            }
        }
    }
    (scored, failures)
}
