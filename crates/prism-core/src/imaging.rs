//! Pixel helpers shared by the built-in modules.
//!
//! Filtering, edge detection and global thresholds come from `imageproc`.
//! What lives here is what it lacks: Rec. 601 grayscale conversion, CLAHE,
//! offset-adjusted adaptive thresholds and a few buffer statistics.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::{box_filter, gaussian_blur_f32};

/// Pixel value used for "on" pixels in binary masks.
pub const WHITE: u8 = 255;

/// Grayscale conversion with Rec. 601 weights (`0.299 R + 0.587 G + 0.114 B`).
///
/// Alpha is dropped. 8-bit gray sources are returned as-is.
pub fn to_gray(image: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = image {
        return gray.clone();
    }
    let rgb = image.to_rgb8();
    let mut gray = GrayImage::new(rgb.width(), rgb.height());
    for (dst, src) in gray.pixels_mut().zip(rgb.pixels()) {
        let [r, g, b] = src.0.map(u32::from);
        dst.0[0] = ((299 * r + 587 * g + 114 * b + 500) / 1000) as u8;
    }
    gray
}

/// Arithmetic mean, 0 for an empty buffer.
pub fn mean(pixels: &[u8]) -> f64 {
    if pixels.is_empty() {
        return 0.0;
    }
    pixels.iter().map(|&p| p as f64).sum::<f64>() / pixels.len() as f64
}

/// Population standard deviation, 0 for an empty buffer.
pub fn std_dev(pixels: &[u8]) -> f64 {
    if pixels.is_empty() {
        return 0.0;
    }
    let m = mean(pixels);
    let var = pixels
        .iter()
        .map(|&p| (p as f64 - m).powi(2))
        .sum::<f64>()
        / pixels.len() as f64;
    var.sqrt()
}

/// Mean value of a 256-bin histogram, 0 when it is empty.
pub fn histogram_mean(counts: &[u32; 256]) -> f64 {
    let total: u64 = counts.iter().map(|&c| u64::from(c)).sum();
    if total == 0 {
        return 0.0;
    }
    let weighted: f64 = counts
        .iter()
        .enumerate()
        .map(|(v, &c)| v as f64 * f64::from(c))
        .sum();
    weighted / total as f64
}

/// Number of pixels equal to [`WHITE`].
pub fn count_white(mask: &GrayImage) -> u64 {
    mask.as_raw().iter().filter(|&&p| p == WHITE).count() as u64
}

/// Percentage of `part` in `total`, 0 when `total` is 0.
pub fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a `grid`×`grid` layout of tiles. Each tile's
/// histogram is clipped at `clip_limit` times the uniform bin height, the
/// excess is spread evenly over all bins and the resulting mapping is
/// bilinearly interpolated between tile centers.
pub fn clahe(image: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }
    let tile_w = w.div_ceil(grid.clamp(1, w));
    let tile_h = h.div_ceil(grid.clamp(1, h));
    let tiles_x = w.div_ceil(tile_w);
    let tiles_y = h.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);
            let mut counts = [0u64; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    counts[image.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            let area = ((x1 - x0) * (y1 - y0)) as u64;
            luts.push(clipped_lut(&mut counts, area, clip_limit));
        }
    }

    // Tile index to the left of (or above) a coordinate and the weight of
    // the next tile.
    let locate = |pos: u32, tile: u32, tiles: u32| -> (usize, usize, f32) {
        let f = (pos as f32 + 0.5) / tile as f32 - 0.5;
        if f <= 0.0 {
            return (0, 0, 0.0);
        }
        let t0 = (f.floor() as u32).min(tiles - 1);
        let t1 = (t0 + 1).min(tiles - 1);
        (t0 as usize, t1 as usize, (f - t0 as f32).clamp(0.0, 1.0))
    };

    let tiles_x = tiles_x as usize;
    GrayImage::from_fn(w, h, |x, y| {
        let v = image.get_pixel(x, y)[0] as usize;
        let (x0, x1, ax) = locate(x, tile_w, tiles_x as u32);
        let (y0, y1, ay) = locate(y, tile_h, tiles_y);
        let at = |tx: usize, ty: usize| luts[ty * tiles_x + tx][v] as f32;
        let top = at(x0, y0) * (1.0 - ax) + at(x1, y0) * ax;
        let bottom = at(x0, y1) * (1.0 - ax) + at(x1, y1) * ax;
        Luma([(top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u8])
    })
}

fn clipped_lut(counts: &mut [u64; 256], area: u64, clip_limit: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if area == 0 {
        return lut;
    }
    if clip_limit > 0.0 {
        let clip = ((clip_limit * area as f32 / 256.0) as u64).max(1);
        let mut excess = 0u64;
        for c in counts.iter_mut() {
            if *c > clip {
                excess += *c - clip;
                *c = clip;
            }
        }
        let share = excess / 256;
        let remainder = (excess % 256) as usize;
        for (i, c) in counts.iter_mut().enumerate() {
            *c += share + u64::from(i < remainder);
        }
    }

    let scale = 255.0 / area as f64;
    let mut cdf = 0u64;
    for (v, &c) in counts.iter().enumerate() {
        cdf += c;
        lut[v] = (cdf as f64 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Neighborhood used to estimate the local threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalMean {
    /// Unweighted mean over a square window of the given radius
    Box { radius: u32 },
    /// Gaussian-weighted mean
    Gaussian { sigma: f32 },
}

/// Adaptive threshold against a local mean.
///
/// A pixel becomes [`WHITE`] when it is above `local_mean - offset`.
pub fn adaptive_threshold(image: &GrayImage, local: LocalMean, offset: f32) -> GrayImage {
    if image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    let means = match local {
        LocalMean::Box { radius } => box_filter(image, radius, radius),
        LocalMean::Gaussian { sigma } => gaussian_blur_f32(image, sigma.max(0.1)),
    };
    let mut out = GrayImage::new(image.width(), image.height());
    for ((dst, &src), &m) in out.iter_mut().zip(image.as_raw()).zip(means.as_raw()) {
        *dst = if src as f32 > m as f32 - offset { WHITE } else { 0 };
    }
    out
}
