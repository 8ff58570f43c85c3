//! Pixel-only augmentations.
//!
//! None of these touch geometry. Contrast, saturation and sharpness are
//! enhancement blends: each builds a "degenerate" image and interpolates
//!
//! ```text
//! out = degenerate + factor * (input - degenerate)
//! ```
//!
//! so a factor of 1.0 returns the input, 0.0 returns the degenerate image
//! and values above 1.0 extrapolate away from it. Alpha is never changed.

use image::{DynamicImage, Rgba, RgbaImage};
use rand::{RngExt, SeedableRng, rngs::StdRng};

/// Smoothing kernel whose output is the degenerate image for sharpness.
const SMOOTH_KERNEL: [f32; 9] = [1.0, 1.0, 1.0, 1.0, 5.0, 1.0, 1.0, 1.0, 1.0];

/// One pixel-only transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhotometricOp {
    /// Add a constant to every RGB channel
    Brightness(f32),
    /// Blend against the mean grey level
    Contrast(f32),
    /// Gaussian blur with the given sigma
    Blur(f32),
    /// Additive Gaussian noise with the given sigma, reproducible from `seed`
    Noise { sigma: f32, seed: u64 },
    /// Blend against the greyscale image
    Saturation(f32),
    /// Blend against a smoothed copy
    Sharpness(f32),
}

impl PhotometricOp {
    /// Label used in variant names, e.g. `bright+1` or `contrast1.2`.
    pub fn label(&self) -> String {
        match self {
            PhotometricOp::Brightness(delta) => format!("bright{:+}", delta),
            PhotometricOp::Contrast(factor) => format!("contrast{}", factor),
            PhotometricOp::Blur(radius) => format!("blur{}", radius),
            PhotometricOp::Noise { sigma, .. } => format!("noise{}", sigma),
            PhotometricOp::Saturation(factor) => format!("sat{}", factor),
            PhotometricOp::Sharpness(factor) => format!("sharp{}", factor),
        }
    }

    /// Apply the transform, returning a new RGBA image of the same size.
    pub fn apply(&self, image: &DynamicImage) -> DynamicImage {
        let rgba = image.to_rgba8();
        let out = match *self {
            PhotometricOp::Brightness(delta) => map_rgb(&rgba, |c| f32::from(c) + delta),
            PhotometricOp::Contrast(factor) => {
                let mean = mean_luma(&rgba);
                map_rgb(&rgba, |c| blend(mean, f32::from(c), factor))
            }
            PhotometricOp::Blur(sigma) => {
                if sigma <= 0.0 {
                    rgba
                } else {
                    let mut out = image::imageops::blur(&rgba, sigma);
                    for (pixel, source) in out.pixels_mut().zip(rgba.pixels()) {
                        pixel.0[3] = source.0[3];
                    }
                    out
                }
            }
            PhotometricOp::Noise { sigma, seed } => add_noise(&rgba, sigma, seed),
            PhotometricOp::Saturation(factor) => {
                let mut out = rgba.clone();
                for pixel in out.pixels_mut() {
                    let grey = luma(pixel);
                    set_rgb(pixel, |c| blend(grey, f32::from(c), factor));
                }
                out
            }
            PhotometricOp::Sharpness(factor) => {
                let smooth = image::imageops::filter3x3(&rgba, &SMOOTH_KERNEL);
                let mut out = rgba.clone();
                for (pixel, degenerate) in out.pixels_mut().zip(smooth.pixels()) {
                    let [dr, dg, db, _] = degenerate.0;
                    let [r, g, b, a] = pixel.0;
                    *pixel = Rgba([
                        clamp_channel(blend(f32::from(dr), f32::from(r), factor)),
                        clamp_channel(blend(f32::from(dg), f32::from(g), factor)),
                        clamp_channel(blend(f32::from(db), f32::from(b), factor)),
                        a,
                    ]);
                }
                out
            }
        };
        DynamicImage::ImageRgba8(out)
    }
}

fn blend(degenerate: f32, value: f32, factor: f32) -> f32 {
    degenerate + factor * (value - degenerate)
}

fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// ITU-R 601-2 luma, the same weights greyscale conversion uses.
fn luma(pixel: &Rgba<u8>) -> f32 {
    let [r, g, b, _] = pixel.0;
    (f32::from(r) * 299.0 + f32::from(g) * 587.0 + f32::from(b) * 114.0) / 1000.0
}

fn mean_luma(image: &RgbaImage) -> f32 {
    let count = u64::from(image.width()) * u64::from(image.height());
    if count == 0 {
        return 0.0;
    }
    let total: f64 = image.pixels().map(|p| f64::from(luma(p))).sum();
    (total / count as f64).round() as f32
}

fn set_rgb(pixel: &mut Rgba<u8>, f: impl Fn(u8) -> f32) {
    for channel in pixel.0.iter_mut().take(3) {
        *channel = clamp_channel(f(*channel));
    }
}

fn map_rgb(image: &RgbaImage, f: impl Fn(u8) -> f32) -> RgbaImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        set_rgb(pixel, &f);
    }
    out
}

fn add_noise(image: &RgbaImage, sigma: f32, seed: u64) -> RgbaImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        for channel in pixel.0.iter_mut().take(3) {
            let noise = gaussian(&mut rng) * f64::from(sigma);
            *channel = clamp_channel((f64::from(*channel) + noise) as f32);
        }
    }
    out
}

/// Standard normal sample via the Box-Muller transform.
fn gaussian<R: RngExt + ?Sized>(rng: &mut R) -> f64 {
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
