//! Canny edge detection modules.
//!
//! Edge maps come from `imageproc`, whose Canny smooths with a Gaussian
//! (sigma 1.4) before taking Sobel gradients, thins them by non-maximum
//! suppression and keeps weak edges only when they connect to a strong one.

use image::{DynamicImage, GrayImage};
use imageproc::filter::gaussian_blur_f32;
use std::sync::Arc;

use crate::config::Config;
use crate::error::ModuleError;
use crate::imaging;
use crate::module::{AnalysisModule, ModuleInput};
use crate::modules::preview::PreviewEncoder;
use crate::modules::{load_failure, round_to};
use crate::types::{AnalysisOutcome, ModuleOutput};

pub const BLUR_KERNEL_SIZE: u32 = 5;
/// Sigma derived from a 5-tap kernel, `0.3 * ((5 - 1) * 0.5 - 1) + 0.8`.
pub const BLUR_SIGMA: f32 = 1.1;

/// Binary edge map of `gray` using hysteresis thresholds `low` and `high`.
///
/// Images smaller than 3×3 have no edges.
pub fn edge_map(gray: &GrayImage, low: f32, high: f32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return GrayImage::new(w, h);
    }
    let (low, high) = if low > high { (high, low) } else { (low, high) };
    imageproc::edges::canny(gray, low, high)
}

/// One Canny configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CannyPreset {
    pub name: &'static str,
    pub low: f32,
    pub high: f32,
    pub blur: bool,
    summary: &'static str,
}

pub const STANDARD: CannyPreset = CannyPreset {
    name: "Canny 1: Standard Detection (50-150)",
    low: 50.0,
    high: 150.0,
    blur: false,
    summary: "Edges detected",
};

pub const SENSITIVE: CannyPreset = CannyPreset {
    name: "Canny 2: High Sensitivity (30-100)",
    low: 30.0,
    high: 100.0,
    blur: false,
    summary: "Sensitive detection. Edges",
};

pub const STRICT: CannyPreset = CannyPreset {
    name: "Canny 3: Low Sensitivity (100-200)",
    low: 100.0,
    high: 200.0,
    blur: false,
    summary: "Strict detection. Edges",
};

pub const BLURRED: CannyPreset = CannyPreset {
    name: "Canny 4: Gaussian Blur (Noise Reduction)",
    low: 50.0,
    high: 150.0,
    blur: true,
    summary: "Blur applied to reduce noise. Edges",
};

#[derive(Debug, Clone)]
pub struct EdgeDetection {
    preset: CannyPreset,
    preview: PreviewEncoder,
}

impl EdgeDetection {
    pub fn new(preset: CannyPreset, preview: PreviewEncoder) -> Self {
        Self { preset, preview }
    }

    pub fn analyze(&self, gray: &GrayImage) -> AnalysisOutcome {
        let blurred = self
            .preset
            .blur
            .then(|| gaussian_blur_f32(gray, BLUR_SIGMA));
        let edges = edge_map(blurred.as_ref().unwrap_or(gray), self.preset.low, self.preset.high);

        let edge_pixels = imaging::count_white(&edges);
        let total = edges.as_raw().len() as u64;
        let percent = imaging::percent(edge_pixels, total);

        let mut outcome = AnalysisOutcome::new()
            .with_detail(format!("{}: {percent:.2}%", self.preset.summary))
            .with_metric("threshold_min", self.preset.low as u32)
            .with_metric("threshold_max", self.preset.high as u32)
            .with_metric("edge_pixels", edge_pixels)
            .with_metric("percent", round_to(percent, 2))
            .with_metric("total_pixels", total);
        if self.preset.blur {
            outcome = outcome.with_metric("blur_kernel", BLUR_KERNEL_SIZE);
        }

        if self.preview.is_enabled() {
            let original = DynamicImage::ImageLuma8(gray.clone());
            let edge_view = DynamicImage::ImageLuma8(edges);
            let blur_view = blurred.map(DynamicImage::ImageLuma8);
            let mut images = vec![("original", &original)];
            if let Some(view) = &blur_view {
                images.push(("blurred", view));
            }
            images.push(("edges", &edge_view));
            outcome = self.preview.attach(outcome, &images);
        }
        outcome
    }
}

impl AnalysisModule for EdgeDetection {
    fn name(&self) -> &str {
        self.preset.name
    }

    fn process(&self, input: &ModuleInput) -> Result<ModuleOutput, ModuleError> {
        let gray = match input.load_gray() {
            Ok(gray) => gray,
            Err(e) => return Ok(load_failure(self.name(), e)),
        };
        Ok(self.analyze(&gray).into())
    }
}

fn build(preset: CannyPreset, config: &Config) -> Result<Arc<dyn AnalysisModule>, ModuleError> {
    Ok(Arc::new(EdgeDetection::new(
        preset,
        PreviewEncoder::new(&config.modules),
    )))
}

pub fn canny_50_150_factory(config: &Config) -> Result<Arc<dyn AnalysisModule>, ModuleError> {
    build(STANDARD, config)
}

pub fn canny_30_100_factory(config: &Config) -> Result<Arc<dyn AnalysisModule>, ModuleError> {
    build(SENSITIVE, config)
}

pub fn canny_100_200_factory(config: &Config) -> Result<Arc<dyn AnalysisModule>, ModuleError> {
    build(STRICT, config)
}

pub fn canny_blur_factory(config: &Config) -> Result<Arc<dyn AnalysisModule>, ModuleError> {
    build(BLURRED, config)
}
