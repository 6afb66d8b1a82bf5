//! GLCM texture modules.

use image::GrayImage;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::config::{Config, GlcmConfig};
use crate::error::ModuleError;
use crate::glcm::{self, Glcm, GlcmAnalyzer};
use crate::module::{AnalysisModule, ModuleInput};
use crate::modules::load_failure;
use crate::types::{AnalysisOutcome, ModuleOutput};

pub const TEXTURE_MODULE_NAME: &str = "GLCM: Texture Analysis";
pub const CONTRAST_MODULE_NAME: &str = "GLCM: Contrast & Homogeneity";
pub const ENERGY_MODULE_NAME: &str = "GLCM: Energy & Entropy";

/// Multi-angle texture analysis with per-feature mean and spread.
#[derive(Debug, Clone)]
pub struct TextureAnalysis {
    analyzer: GlcmAnalyzer,
}

impl TextureAnalysis {
    pub fn new(config: &GlcmConfig) -> Self {
        Self {
            analyzer: GlcmAnalyzer::new(config.distance, config.angles_deg.clone(), config.levels),
        }
    }

    /// Analyze an already decoded grayscale image.
    pub fn analyze(&self, gray: &GrayImage) -> AnalysisOutcome {
        let angles = self.analyzer.per_angle(gray);
        let Some(stats) = glcm::aggregate(&angles) else {
            return AnalysisOutcome::failure(format!(
                "Could not compute GLCM features: no valid pixel pairs in a {}x{} image",
                gray.width(),
                gray.height()
            ));
        };

        let mut outcome = AnalysisOutcome::new();
        for s in &stats {
            outcome = outcome
                .with_metric(s.name, s.mean)
                .with_metric(format!("{}_std", s.name), s.std);
        }
        outcome = outcome
            .with_metric("levels", self.analyzer.levels())
            .with_metric("distance", self.analyzer.distance())
            .with_metric("valid_angles", angles.len())
            .with_metric("image_height", gray.height())
            .with_metric("image_width", gray.width());

        let mut info = Map::new();
        for a in &angles {
            info.insert(
                format!("angle_{}", a.angle_deg),
                json!({ "nonzero_cells": a.nonzero_cells, "sum": a.sum }),
            );
        }
        let analysed: Vec<f64> = angles.iter().map(|a| a.angle_deg).collect();

        let metric = |name: &str| outcome.metric_f64(name).unwrap_or_default();
        let detail = format!(
            "GLCM with {} levels. Contrast: {:.2}, Homogeneity: {:.3}, Entropy: {:.3}",
            self.analyzer.levels(),
            metric("contrast"),
            metric("homogeneity"),
            metric("entropy"),
        );

        outcome
            .with_detail(detail)
            .with_extra("angles", analysed)
            .with_extra("glcm_info", Value::Object(info))
    }
}

impl AnalysisModule for TextureAnalysis {
    fn name(&self) -> &str {
        TEXTURE_MODULE_NAME
    }

    fn priority(&self) -> i32 {
        70
    }

    fn process(&self, input: &ModuleInput) -> Result<ModuleOutput, ModuleError> {
        let gray = match input.load_gray() {
            Ok(gray) => gray,
            Err(e) => return Ok(load_failure(self.name(), e)),
        };
        Ok(self.analyze(&gray).into())
    }
}

/// Which single-angle summary a [`HorizontalTexture`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFocus {
    ContrastHomogeneity,
    EnergyEntropy,
}

/// Single-angle (0°) GLCM summary reporting three features.
#[derive(Debug, Clone)]
pub struct HorizontalTexture {
    focus: TextureFocus,
    distance: u32,
    levels: usize,
}

impl HorizontalTexture {
    pub fn new(focus: TextureFocus, config: &GlcmConfig) -> Self {
        Self {
            focus,
            distance: config.distance,
            levels: config.levels,
        }
    }

    pub fn analyze(&self, gray: &GrayImage) -> AnalysisOutcome {
        let Some(f) = Glcm::compute(gray, self.distance, 0.0, self.levels).features() else {
            return AnalysisOutcome::failure("Could not compute GLCM features: no horizontal pixel pairs");
        };

        match self.focus {
            TextureFocus::ContrastHomogeneity => AnalysisOutcome::new()
                .with_detail(format!(
                    "Contrast: {:.2} | Homogeneity: {:.3} | Dissimilarity: {:.2}",
                    f.contrast, f.homogeneity, f.dissimilarity
                ))
                .with_metric("contrast", f.contrast)
                .with_metric("homogeneity", f.homogeneity)
                .with_metric("dissimilarity", f.dissimilarity),
            TextureFocus::EnergyEntropy => AnalysisOutcome::new()
                .with_detail(format!(
                    "Energy: {:.4} | Entropy: {:.3} | Correlation: {:.3}",
                    f.energy, f.entropy, f.correlation
                ))
                .with_metric("energy", f.energy)
                .with_metric("entropy", f.entropy)
                .with_metric("correlation", f.correlation),
        }
    }
}

impl AnalysisModule for HorizontalTexture {
    fn name(&self) -> &str {
        match self.focus {
            TextureFocus::ContrastHomogeneity => CONTRAST_MODULE_NAME,
            TextureFocus::EnergyEntropy => ENERGY_MODULE_NAME,
        }
    }

    fn priority(&self) -> i32 {
        match self.focus {
            TextureFocus::ContrastHomogeneity => 71,
            TextureFocus::EnergyEntropy => 72,
        }
    }

    fn process(&self, input: &ModuleInput) -> Result<ModuleOutput, ModuleError> {
        let gray = match input.load_gray() {
            Ok(gray) => gray,
            Err(e) => return Ok(load_failure(self.name(), e)),
        };
        Ok(self.analyze(&gray).into())
    }
}

pub fn texture_factory(config: &Config) -> Result<Arc<dyn AnalysisModule>, ModuleError> {
    Ok(Arc::new(TextureAnalysis::new(&config.glcm)))
}

pub fn contrast_factory(config: &Config) -> Result<Arc<dyn AnalysisModule>, ModuleError> {
    Ok(Arc::new(HorizontalTexture::new(
        TextureFocus::ContrastHomogeneity,
        &config.glcm,
    )))
}

pub fn energy_factory(config: &Config) -> Result<Arc<dyn AnalysisModule>, ModuleError> {
    Ok(Arc::new(HorizontalTexture::new(
        TextureFocus::EnergyEntropy,
        &config.glcm,
    )))
}
