//! Histogram equalization module.

use image::{DynamicImage, GrayImage};
use imageproc::contrast::equalize_histogram;
use std::sync::Arc;

use crate::config::Config;
use crate::error::ModuleError;
use crate::imaging;
use crate::module::{AnalysisModule, ModuleInput};
use crate::modules::load_failure;
use crate::modules::preview::PreviewEncoder;
use crate::types::{AnalysisOutcome, ModuleOutput};

pub const MODULE_NAME: &str = "Histogram Equalization";

const CLAHE_CLIP_LIMIT: f32 = 2.0;
const CLAHE_GRID: u32 = 8;

/// Compares pixel spread before and after global equalization and CLAHE.
#[derive(Debug, Clone)]
pub struct Equalization {
    preview: PreviewEncoder,
}

/// Relative change of `after` over `before`, in percent.
fn improvement(before: f64, after: f64) -> f64 {
    (after - before) / (before + 1e-6) * 100.0
}

impl Equalization {
    pub fn new(preview: PreviewEncoder) -> Self {
        Self { preview }
    }

    pub fn analyze(&self, gray: &GrayImage) -> AnalysisOutcome {
        let equalized = equalize_histogram(gray);
        let adaptive = imaging::clahe(gray, CLAHE_CLIP_LIMIT, CLAHE_GRID);

        let original_std = imaging::std_dev(gray.as_raw());
        let equalized_std = imaging::std_dev(equalized.as_raw());
        let adaptive_std = imaging::std_dev(adaptive.as_raw());
        let gain = improvement(original_std, equalized_std);
        let adaptive_gain = improvement(original_std, adaptive_std);

        let detail = format!(
            "Equalization complete. Original contrast: {original_std:.2}. \
             After global equalization: {equalized_std:.2} ({gain:+.1}%). \
             After CLAHE: {adaptive_std:.2} ({adaptive_gain:+.1}%)."
        );

        let mut outcome = AnalysisOutcome::new()
            .with_detail(detail)
            .with_metric("contrast_original", original_std)
            .with_metric("contrast_equalized", equalized_std)
            .with_metric("contrast_clahe", adaptive_std)
            .with_metric("improvement_percent", gain)
            .with_metric("improvement_clahe_percent", adaptive_gain)
            .with_metric("method", "Histogram Equalization (global + CLAHE)");

        if self.preview.is_enabled() {
            let original = DynamicImage::ImageLuma8(gray.clone());
            let equalized = DynamicImage::ImageLuma8(equalized);
            let adaptive = DynamicImage::ImageLuma8(adaptive);
            outcome = self.preview.attach(
                outcome,
                &[
                    ("original", &original),
                    ("equalized", &equalized),
                    ("equalized_clahe", &adaptive),
                ],
            );
        }
        outcome
    }
}

impl AnalysisModule for Equalization {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn priority(&self) -> i32 {
        20
    }

    fn process(&self, input: &ModuleInput) -> Result<ModuleOutput, ModuleError> {
        let gray = match input.load_gray() {
            Ok(gray) => gray,
            Err(e) => return Ok(load_failure(self.name(), e)),
        };
        Ok(self.analyze(&gray).into())
    }
}

pub fn factory(config: &Config) -> Result<Arc<dyn AnalysisModule>, ModuleError> {
    Ok(Arc::new(Equalization::new(PreviewEncoder::new(
        &config.modules,
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::tests::{garbage_input, input_for};
    use image::Luma;

    #[test]
    fn test_low_contrast_image_improves() {
        let img = GrayImage::from_fn(32, 32, |x, _| Luma([110 + (x % 8) as u8]));
        let outcome = Equalization::new(PreviewEncoder::disabled()).analyze(&img);

        let before = outcome.metric_f64("contrast_original").unwrap();
        let after = outcome.metric_f64("contrast_equalized").unwrap();
        assert!(after > before);
        assert!(outcome.metric_f64("improvement_percent").unwrap() > 0.0);
        assert!(outcome.metric_f64("contrast_clahe").is_some());
        assert!(outcome.detail.unwrap().starts_with("Equalization complete."));
    }

    #[test]
    fn test_uniform_image_has_no_improvement() {
        let img = GrayImage::from_pixel(10, 10, Luma([42]));
        let outcome = Equalization::new(PreviewEncoder::disabled()).analyze(&img);
        assert_eq!(outcome.metric_f64("contrast_original"), Some(0.0));
        assert_eq!(outcome.metric_f64("improvement_percent"), Some(0.0));
    }

    #[test]
    fn test_previews_attached() {
        let config = Config::default();
        let module = Equalization::new(PreviewEncoder::new(&config.modules));
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(16, 16, |x, y| Luma([(x * y) as u8])));
        let outcome = module.process(&input_for(&img)).unwrap().into_outcome();
        let images = outcome.extra["images"].as_object().unwrap();
        assert_eq!(images.len(), 3);
    }

    #[test]
    fn test_runs_early_and_recovers_decode_failure() {
        let module = Equalization::new(PreviewEncoder::disabled());
        assert_eq!(module.priority(), 20);
        let outcome = module.process(&garbage_input()).unwrap().into_outcome();
        assert!(outcome.metrics.is_empty());
    }
}
