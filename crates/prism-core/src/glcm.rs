//! Gray-level co-occurrence matrices and Haralick texture features.
//!
//! A GLCM counts, for one pixel offset, how often a pixel of gray level `i`
//! has a neighbor of gray level `j`. Gray values are first quantized to
//! `levels` buckets. After normalization the matrix is a joint probability
//! distribution, from which second-order statistics are derived.
//!
//! Offsets follow image coordinates: `dx` to the right, `dy` downwards, so an
//! angle of 90° pairs each pixel with the one below it.

use image::GrayImage;
use serde::Serialize;

/// Standard deviations below this make correlation undefined; it is
/// reported as 0.
pub const CORRELATION_EPSILON: f64 = 1e-10;

/// Feature names in reporting order.
pub const FEATURE_NAMES: [&str; 6] = [
    "contrast",
    "dissimilarity",
    "homogeneity",
    "energy",
    "correlation",
    "entropy",
];

/// Map an 8-bit gray value to one of `levels` buckets.
///
/// Equivalent to `floor(value / (256 / levels))`, clamped to
/// `[0, levels - 1]`. With 256 or more levels the value is used as is.
#[inline]
pub fn quantize(value: u8, levels: usize) -> usize {
    if levels >= 256 {
        return value as usize;
    }
    (value as usize * levels / 256).min(levels.saturating_sub(1))
}

/// Integer pixel offset for a distance and an angle in radians.
pub fn offset(distance: u32, angle_rad: f64) -> (isize, isize) {
    let d = distance as f64;
    (
        (d * angle_rad.cos()).round() as isize,
        (d * angle_rad.sin()).round() as isize,
    )
}

/// A square co-occurrence matrix, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Glcm {
    levels: usize,
    cells: Vec<f64>,
}

impl Glcm {
    /// Count co-occurrences at `(distance, angle_rad)` and normalize.
    ///
    /// An image with no in-bounds pixel pair (e.g. 1×1) yields the all-zero
    /// matrix.
    pub fn compute(image: &GrayImage, distance: u32, angle_rad: f64, levels: usize) -> Self {
        let levels = levels.max(1);
        let mut glcm = Self::accumulate(image, offset(distance, angle_rad), levels);
        glcm.normalize();
        glcm
    }

    fn accumulate(image: &GrayImage, (dx, dy): (isize, isize), levels: usize) -> Self {
        let w = image.width() as isize;
        let h = image.height() as isize;
        let quantized: Vec<usize> = image.as_raw().iter().map(|&v| quantize(v, levels)).collect();
        let mut cells = vec![0.0; levels * levels];

        // Every (y, x) in these ranges has its neighbor in bounds.
        let rows = (-dy).max(0)..(h - dy).min(h);
        let cols = (-dx).max(0)..(w - dx).min(w);

        for y in rows {
            let row = y * w;
            let neighbor_row = (y + dy) * w;
            for x in cols.clone() {
                let a = quantized[(row + x) as usize];
                let b = quantized[(neighbor_row + x + dx) as usize];
                cells[a * levels + b] += 1.0;
            }
        }

        Self { levels, cells }
    }

    fn normalize(&mut self) {
        let total: f64 = self.cells.iter().sum();
        if total > 0.0 {
            for c in &mut self.cells {
                *c /= total;
            }
        }
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Probability of level `i` co-occurring with level `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.cells[i * self.levels + j]
    }

    pub fn sum(&self) -> f64 {
        self.cells.iter().sum()
    }

    pub fn nonzero_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c > 0.0).count()
    }

    /// True when no pixel pair was counted.
    pub fn is_empty(&self) -> bool {
        self.sum() <= 0.0
    }

    /// Haralick-style descriptors, or `None` for an empty matrix.
    pub fn features(&self) -> Option<TextureFeatures> {
        if self.is_empty() {
            return None;
        }

        let n = self.levels;
        let mut f = TextureFeatures::default();
        let mut mu_i = 0.0;
        let mut mu_j = 0.0;

        for i in 0..n {
            for j in 0..n {
                let p = self.cells[i * n + j];
                if p == 0.0 {
                    continue;
                }
                let d = i as f64 - j as f64;
                f.contrast += p * d * d;
                f.dissimilarity += p * d.abs();
                f.homogeneity += p / (1.0 + d * d);
                f.energy += p * p;
                f.entropy -= p * p.log2();
                mu_i += i as f64 * p;
                mu_j += j as f64 * p;
            }
        }

        let mut var_i = 0.0;
        let mut var_j = 0.0;
        let mut cov = 0.0;
        for i in 0..n {
            for j in 0..n {
                let p = self.cells[i * n + j];
                if p == 0.0 {
                    continue;
                }
                let di = i as f64 - mu_i;
                let dj = j as f64 - mu_j;
                var_i += p * di * di;
                var_j += p * dj * dj;
                cov += p * di * dj;
            }
        }
        let sigma_i = var_i.sqrt();
        let sigma_j = var_j.sqrt();
        f.correlation = if sigma_i > CORRELATION_EPSILON && sigma_j > CORRELATION_EPSILON {
            cov / (sigma_i * sigma_j)
        } else {
            0.0
        };

        Some(f)
    }
}

/// Second-order texture descriptors of one GLCM.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TextureFeatures {
    pub contrast: f64,
    pub dissimilarity: f64,
    pub homogeneity: f64,
    pub energy: f64,
    pub correlation: f64,
    pub entropy: f64,
}

impl TextureFeatures {
    /// `(name, value)` pairs in [`FEATURE_NAMES`] order.
    pub fn values(&self) -> [(&'static str, f64); 6] {
        [
            ("contrast", self.contrast),
            ("dissimilarity", self.dissimilarity),
            ("homogeneity", self.homogeneity),
            ("energy", self.energy),
            ("correlation", self.correlation),
            ("entropy", self.entropy),
        ]
    }
}

/// Features of one angle that produced a non-empty matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct AngleFeatures {
    pub angle_deg: f64,
    pub nonzero_cells: usize,
    pub sum: f64,
    pub features: TextureFeatures,
}

/// Mean and population standard deviation of one feature across angles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureStats {
    pub name: &'static str,
    pub mean: f64,
    pub std: f64,
}

/// Multi-angle GLCM analysis with fixed parameters.
#[derive(Debug, Clone)]
pub struct GlcmAnalyzer {
    distance: u32,
    angles_deg: Vec<f64>,
    levels: usize,
}

impl GlcmAnalyzer {
    pub fn new(distance: u32, angles_deg: Vec<f64>, levels: usize) -> Self {
        Self {
            distance,
            angles_deg,
            levels,
        }
    }

    pub fn distance(&self) -> u32 {
        self.distance
    }

    pub fn angles_deg(&self) -> &[f64] {
        &self.angles_deg
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Features for every configured angle whose matrix is non-empty.
    pub fn per_angle(&self, image: &GrayImage) -> Vec<AngleFeatures> {
        self.angles_deg
            .iter()
            .filter_map(|&angle_deg| {
                let glcm = Glcm::compute(image, self.distance, angle_deg.to_radians(), self.levels);
                let features = glcm.features();
                if features.is_none() {
                    tracing::debug!("GLCM at {angle_deg}° has no valid pixel pairs, skipping");
                }
                features.map(|features| AngleFeatures {
                    angle_deg,
                    nonzero_cells: glcm.nonzero_count(),
                    sum: glcm.sum(),
                    features,
                })
            })
            .collect()
    }
}

/// Mean and standard deviation of each feature over `angles`, or `None`
/// if there are no angles.
pub fn aggregate(angles: &[AngleFeatures]) -> Option<Vec<FeatureStats>> {
    if angles.is_empty() {
        return None;
    }
    let n = angles.len() as f64;
    let stats = (0..FEATURE_NAMES.len())
        .map(|k| {
            let values: Vec<f64> = angles.iter().map(|a| a.features.values()[k].1).collect();
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            FeatureStats {
                name: FEATURE_NAMES[k],
                mean,
                std: var.sqrt(),
            }
        })
        .collect();
    Some(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    const EPS: f64 = 1e-12;

    fn checkerboard(w: u32, h: u32, a: u8, b: u8) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| Luma([if (x + y) % 2 == 0 { a } else { b }]))
    }

    /// Straightforward per-pixel bounds-checked counting, for cross-checks.
    fn reference_counts(image: &GrayImage, dx: isize, dy: isize, levels: usize) -> Vec<f64> {
        let mut cells = vec![0.0; levels * levels];
        for y in 0..image.height() as isize {
            for x in 0..image.width() as isize {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= image.width() as isize || ny >= image.height() as isize {
                    continue;
                }
                let a = quantize(image.get_pixel(x as u32, y as u32)[0], levels);
                let b = quantize(image.get_pixel(nx as u32, ny as u32)[0], levels);
                cells[a * levels + b] += 1.0;
            }
        }
        cells
    }

    #[test]
    fn test_quantize_stays_in_range() {
        for levels in [2, 3, 7, 16, 64, 100, 255, 256] {
            for v in 0..=255u8 {
                assert!(quantize(v, levels) < levels, "v={v} levels={levels}");
            }
        }
        assert_eq!(quantize(255, 64), 63);
        assert_eq!(quantize(0, 64), 0);
        assert_eq!(quantize(4, 64), 1);
        assert_eq!(quantize(200, 256), 200);
    }

    #[test]
    fn test_offsets_for_standard_angles() {
        assert_eq!(offset(1, 0f64.to_radians()), (1, 0));
        assert_eq!(offset(1, 45f64.to_radians()), (1, 1));
        assert_eq!(offset(1, 90f64.to_radians()), (0, 1));
        assert_eq!(offset(1, 135f64.to_radians()), (-1, 1));
        assert_eq!(offset(2, 180f64.to_radians()), (-2, 0));
    }

    #[test]
    fn test_uniform_image_is_single_spike() {
        let img = GrayImage::from_pixel(10, 10, Luma([128]));
        let glcm = Glcm::compute(&img, 1, 0.0, 64);
        let level = quantize(128, 64);

        assert!((glcm.get(level, level) - 1.0).abs() < EPS);
        assert_eq!(glcm.nonzero_count(), 1);

        let f = glcm.features().unwrap();
        assert!(f.contrast.abs() < EPS);
        assert!(f.dissimilarity.abs() < EPS);
        assert!((f.homogeneity - 1.0).abs() < EPS);
        assert!((f.energy - 1.0).abs() < EPS);
        assert!(f.entropy.abs() < EPS);
        assert_eq!(f.correlation, 0.0);
    }

    #[test]
    fn test_checkerboard_horizontal_features() {
        // Pixel values 0 and 40 quantize to levels 0 and 10.
        let img = checkerboard(8, 8, 0, 40);
        let f = Glcm::compute(&img, 1, 0.0, 64).features().unwrap();
        let (a, b) = (0.0_f64, 10.0_f64);

        assert!((f.contrast - (a - b).powi(2)).abs() < 1e-9);
        assert!((f.dissimilarity - (a - b).abs()).abs() < 1e-9);
        assert!(f.homogeneity < 1.0);
        assert!((f.homogeneity - 1.0 / 101.0).abs() < 1e-9);
        // Every horizontal pair alternates, so i and j are perfectly anti-correlated.
        assert!((f.correlation + 1.0).abs() < 1e-9);
        // Two equally likely cells.
        assert!((f.entropy - 1.0).abs() < 1e-9);
        assert!((f.energy - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_normalized_matrix_sums_to_one() {
        let img = GrayImage::from_fn(13, 9, |x, y| Luma([((x * 37 + y * 91) % 256) as u8]));
        for angle in [0.0, 45.0, 90.0, 135.0] {
            let glcm = Glcm::compute(&img, 1, f64::to_radians(angle), 64);
            assert!((glcm.sum() - 1.0).abs() < 1e-9);
            assert!(glcm.cells.iter().all(|&c| (0.0..=1.0).contains(&c)));
        }
    }

    #[test]
    fn test_matches_bounds_checked_reference() {
        let img = GrayImage::from_fn(11, 7, |x, y| Luma([((x * 53 + y * 17 + x * y) % 256) as u8]));
        for distance in [1, 2, 3] {
            for angle in [0.0, 45.0, 90.0, 135.0, 180.0, 270.0] {
                let (dx, dy) = offset(distance, f64::to_radians(angle));
                let raw = Glcm::accumulate(&img, (dx, dy), 16);
                assert_eq!(
                    raw.cells,
                    reference_counts(&img, dx, dy, 16),
                    "distance={distance} angle={angle}"
                );
            }
        }
    }

    #[test]
    fn test_one_pixel_image_is_empty() {
        let img = GrayImage::from_pixel(1, 1, Luma([200]));
        for angle in [0.0, 45.0, 90.0, 135.0] {
            let glcm = Glcm::compute(&img, 1, f64::to_radians(angle), 64);
            assert!(glcm.is_empty());
            assert!(glcm.features().is_none());
        }
    }

    #[test]
    fn test_offset_larger_than_image_is_empty() {
        let img = GrayImage::from_pixel(3, 3, Luma([10]));
        assert!(Glcm::compute(&img, 5, 0.0, 8).is_empty());
        assert!(Glcm::compute(&img, 5, std::f64::consts::PI, 8).is_empty());
    }

    #[test]
    fn test_single_row_skips_vertical_angles() {
        let img = GrayImage::from_fn(6, 1, |x, _| Luma([(x * 40) as u8]));
        let analyzer = GlcmAnalyzer::new(1, vec![0.0, 45.0, 90.0, 135.0], 64);
        let angles = analyzer.per_angle(&img);
        assert_eq!(angles.len(), 1);
        assert_eq!(angles[0].angle_deg, 0.0);
    }

    #[test]
    fn test_aggregate_mean_and_std() {
        let mk = |contrast: f64| AngleFeatures {
            angle_deg: 0.0,
            nonzero_cells: 1,
            sum: 1.0,
            features: TextureFeatures {
                contrast,
                ..Default::default()
            },
        };
        let stats = aggregate(&[mk(1.0), mk(3.0)]).unwrap();
        let contrast = stats.iter().find(|s| s.name == "contrast").unwrap();
        assert!((contrast.mean - 2.0).abs() < EPS);
        assert!((contrast.std - 1.0).abs() < EPS);
        assert_eq!(stats.len(), FEATURE_NAMES.len());
    }

    #[test]
    fn test_aggregate_empty_is_none() {
        assert!(aggregate(&[]).is_none());
    }
}
