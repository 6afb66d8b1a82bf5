//! Binarization modules: fixed, Otsu and adaptive thresholds.

use image::{DynamicImage, GrayImage};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use std::sync::Arc;

use crate::config::Config;
use crate::error::ModuleError;
use crate::imaging::{self, LocalMean};
use crate::module::{AnalysisModule, ModuleInput};
use crate::modules::preview::PreviewEncoder;
use crate::modules::{load_failure, round_to};
use crate::types::{AnalysisOutcome, ModuleOutput};

pub const FIXED_THRESHOLD: u8 = 127;
pub const ADAPTIVE_BLOCK_SIZE: u32 = 11;
pub const ADAPTIVE_OFFSET: f32 = 2.0;

/// Sigma of an 11-tap Gaussian derived from its size,
/// `0.3 * ((size - 1) * 0.5 - 1) + 0.8`.
const ADAPTIVE_GAUSSIAN_SIGMA: f32 = 2.0;

/// How the threshold is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdMethod {
    /// Global threshold at [`FIXED_THRESHOLD`]
    Fixed,
    /// Global threshold picked by Otsu's method
    Otsu,
    /// Per-pixel threshold from the local box mean
    AdaptiveMean,
    /// Per-pixel threshold from the local Gaussian-weighted mean
    AdaptiveGaussian,
}

impl ThresholdMethod {
    pub fn module_name(self) -> &'static str {
        match self {
            ThresholdMethod::Fixed => "Threshold 1: Global Fixed (T=127)",
            ThresholdMethod::Otsu => "Threshold 2: Otsu (Automatic)",
            ThresholdMethod::AdaptiveMean => "Threshold 3: Adaptive (Local Mean)",
            ThresholdMethod::AdaptiveGaussian => "Threshold 4: Adaptive (Gaussian)",
        }
    }

    fn preview_name(self) -> &'static str {
        match self {
            ThresholdMethod::Fixed => "binary",
            ThresholdMethod::Otsu => "binary_otsu",
            ThresholdMethod::AdaptiveMean => "adaptive_mean",
            ThresholdMethod::AdaptiveGaussian => "adaptive_gaussian",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Threshold {
    method: ThresholdMethod,
    preview: PreviewEncoder,
}

impl Threshold {
    pub fn new(method: ThresholdMethod, preview: PreviewEncoder) -> Self {
        Self { method, preview }
    }

    pub fn analyze(&self, gray: &GrayImage) -> AnalysisOutcome {
        let (mask, global) = match self.method {
            ThresholdMethod::Fixed => (
                threshold(gray, FIXED_THRESHOLD, ThresholdType::Binary),
                Some(FIXED_THRESHOLD),
            ),
            ThresholdMethod::Otsu => {
                let t = otsu_level(gray);
                (threshold(gray, t, ThresholdType::Binary), Some(t))
            }
            ThresholdMethod::AdaptiveMean => (
                imaging::adaptive_threshold(
                    gray,
                    LocalMean::Box {
                        radius: ADAPTIVE_BLOCK_SIZE / 2,
                    },
                    ADAPTIVE_OFFSET,
                ),
                None,
            ),
            ThresholdMethod::AdaptiveGaussian => (
                imaging::adaptive_threshold(
                    gray,
                    LocalMean::Gaussian {
                        sigma: ADAPTIVE_GAUSSIAN_SIGMA,
                    },
                    ADAPTIVE_OFFSET,
                ),
                None,
            ),
        };

        let white = imaging::count_white(&mask);
        let percent = imaging::percent(white, mask.as_raw().len() as u64);
        let detail = match (self.method, global) {
            (ThresholdMethod::Otsu, Some(t)) => format!(
                "Threshold computed automatically: {t}. White pixels: {percent:.1}%"
            ),
            (_, Some(t)) => format!("Fixed threshold at {t}. White pixels: {percent:.1}%"),
            (ThresholdMethod::AdaptiveGaussian, None) => {
                format!("Adaptive Gaussian threshold. White pixels: {percent:.1}%")
            }
            (_, None) => format!("Adaptive local-mean threshold. White pixels: {percent:.1}%"),
        };

        let mut outcome = AnalysisOutcome::new().with_detail(detail);
        outcome = match global {
            Some(t) => outcome.with_metric("threshold", t),
            None => outcome.with_metric("block_size", ADAPTIVE_BLOCK_SIZE),
        };
        outcome = outcome
            .with_metric("white_pixels", white)
            .with_metric("percent", round_to(percent, 2));

        if self.preview.is_enabled() {
            let original = DynamicImage::ImageLuma8(gray.clone());
            let binary = DynamicImage::ImageLuma8(mask);
            outcome = self.preview.attach(
                outcome,
                &[("original", &original), (self.method.preview_name(), &binary)],
            );
        }
        outcome
    }
}

impl AnalysisModule for Threshold {
    fn name(&self) -> &str {
        self.method.module_name()
    }

    fn process(&self, input: &ModuleInput) -> Result<ModuleOutput, ModuleError> {
        let gray = match input.load_gray() {
            Ok(gray) => gray,
            Err(e) => return Ok(load_failure(self.name(), e)),
        };
        Ok(self.analyze(&gray).into())
    }
}

fn build(method: ThresholdMethod, config: &Config) -> Result<Arc<dyn AnalysisModule>, ModuleError> {
    Ok(Arc::new(Threshold::new(
        method,
        PreviewEncoder::new(&config.modules),
    )))
}

pub fn fixed_factory(config: &Config) -> Result<Arc<dyn AnalysisModule>, ModuleError> {
    build(ThresholdMethod::Fixed, config)
}

pub fn otsu_factory(config: &Config) -> Result<Arc<dyn AnalysisModule>, ModuleError> {
    build(ThresholdMethod::Otsu, config)
}

pub fn adaptive_mean_factory(config: &Config) -> Result<Arc<dyn AnalysisModule>, ModuleError> {
    build(ThresholdMethod::AdaptiveMean, config)
}

pub fn adaptive_gaussian_factory(config: &Config) -> Result<Arc<dyn AnalysisModule>, ModuleError> {
    build(ThresholdMethod::AdaptiveGaussian, config)
}
