//! Built-in analysis modules.
//!
//! Every module decodes its own copy of the image, so a decode problem is
//! reported by that module alone as a descriptive outcome rather than a
//! fault.

pub mod edges;
pub mod equalize;
pub mod histogram;
pub mod preview;
pub mod shapes;
pub mod texture;
pub mod threshold;

use std::sync::Arc;

use crate::config::Config;
use crate::error::{ModuleError, PipelineError};
use crate::module::AnalysisModule;
use crate::types::{AnalysisOutcome, ModuleOutput};

/// Constructor for one built-in module.
pub type ModuleFactory = fn(&Config) -> Result<Arc<dyn AnalysisModule>, ModuleError>;

/// The explicit registration list of built-in modules.
pub fn builtin_factories() -> Vec<ModuleFactory> {
    vec![
        equalize::factory,
        shapes::factory,
        histogram::gray_factory,
        histogram::red_factory,
        histogram::green_factory,
        histogram::blue_factory,
        texture::texture_factory,
        texture::contrast_factory,
        texture::energy_factory,
        threshold::fixed_factory,
        threshold::otsu_factory,
        threshold::adaptive_mean_factory,
        threshold::adaptive_gaussian_factory,
        edges::canny_50_150_factory,
        edges::canny_30_100_factory,
        edges::canny_100_200_factory,
        edges::canny_blur_factory,
    ]
}

/// Outcome reported when a module cannot obtain pixels.
pub(crate) fn load_failure(module: &str, err: PipelineError) -> ModuleOutput {
    tracing::warn!("{module}: cannot load image: {err}");
    AnalysisOutcome::failure(format!("Error loading image: {err}")).into()
}

/// Round for presentation in metrics.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::module::ModuleInput;
    use crate::source::{ImageCrateSource, ImageSource};
    use image::{DynamicImage, ImageFormat};
    use std::io::Cursor;

    /// Module input holding an encoded PNG of `image`.
    pub(crate) fn input_for(image: &DynamicImage) -> ModuleInput {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        let bytes: Arc<[u8]> = buffer.into_inner().into();
        let source: Arc<dyn ImageSource> = Arc::new(ImageCrateSource::default());
        ModuleInput::new("memory.png", Some(bytes), source)
    }

    /// Module input whose bytes are not an image.
    pub(crate) fn garbage_input() -> ModuleInput {
        let bytes: Arc<[u8]> = Arc::from(&b"not an image"[..]);
        let source: Arc<dyn ImageSource> = Arc::new(ImageCrateSource::default());
        ModuleInput::new("garbage.png", Some(bytes), source)
    }

    #[test]
    fn test_every_factory_builds() {
        let config = Config::default();
        for factory in builtin_factories() {
            let module = factory(&config).unwrap();
            assert!(!module.name().is_empty());
        }
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 3), 1.235);
        assert_eq!(round_to(-0.5, 0), -1.0);
    }
}
