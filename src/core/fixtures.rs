//! Synthetic frames for tests.
//!
//! Every frame is 200×200. The horizontal brightness profile decides the
//! difference hash (a falling ramp sets every bit, a rising ramp none), and
//! a 10px checker texture on top supplies the high-frequency detail that
//! makes a frame score as sharp.

use image::{GrayImage, Luma, imageops};
use std::path::Path;

pub const SIZE: u32 = 200;
const SQUARE: u32 = 10;
const TEXTURE: f64 = 40.0;

fn checker_sign(x: u32, y: u32, square: u32) -> f64 {
    if ((x / square) + (y / square)) % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}

pub fn checkerboard(size: u32, square: u32) -> GrayImage {
    GrayImage::from_fn(size, size, |x, y| {
        if checker_sign(x, y, square) > 0.0 {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

pub fn flat(size: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(size, size, Luma([value]))
}

fn textured(profile: impl Fn(f64) -> f64) -> GrayImage {
    GrayImage::from_fn(SIZE, SIZE, |x, y| {
        let value = profile(f64::from(x)) + TEXTURE * checker_sign(x, y, SQUARE);
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Bright on the left, dark on the right: hash `u64::MAX`.
pub fn falling_ramp() -> GrayImage {
    let last = f64::from(SIZE - 1);
    textured(|x| 215.0 - 175.0 * x / last)
}

/// Dark on the left, bright on the right: hash `0`.
pub fn rising_ramp() -> GrayImage {
    let last = f64::from(SIZE - 1);
    textured(|x| 40.0 + 175.0 * x / last)
}

/// Dark in the middle column: hash `0x0F0F_0F0F_0F0F_0F0F`.
pub fn valley() -> GrayImage {
    let half = f64::from(SIZE) / 2.0;
    textured(|x| 40.0 + 175.0 * (x - half).abs() / half)
}

/// Bright in the middle column: hash `0xF0F0_F0F0_F0F0_F0F0`.
pub fn ridge() -> GrayImage {
    let half = f64::from(SIZE) / 2.0;
    textured(|x| 215.0 - 175.0 * (x - half).abs() / half)
}

pub fn gaussian_blurred(image: &GrayImage, sigma: f32) -> GrayImage {
    imageops::blur(image, sigma)
}

pub fn save(image: &GrayImage, path: &Path) {
    image.save(path).unwrap();
}
