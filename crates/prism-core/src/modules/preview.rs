//! PNG data-URL previews attached to module outcomes.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{DynamicImage, GenericImageView, ImageFormat};
use serde_json::{Map, Value};
use std::io::Cursor;

use crate::config::ModulesConfig;
use crate::types::AnalysisOutcome;

/// Key under which previews are stored in an outcome's `extra` section.
pub const IMAGES_KEY: &str = "images";

/// Encodes intermediate images as `data:image/png;base64,...` strings.
#[derive(Debug, Clone)]
pub struct PreviewEncoder {
    enabled: bool,
    max_size: u32,
}

impl PreviewEncoder {
    pub fn new(config: &ModulesConfig) -> Self {
        Self {
            enabled: config.include_images,
            max_size: config.preview_max_size.max(1),
        }
    }

    /// An encoder that never produces previews.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max_size: 1,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Encode an image, shrinking it so its longest edge fits `max_size`.
    ///
    /// Returns `None` if previews are disabled or encoding fails.
    pub fn data_url(&self, image: &DynamicImage) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let (w, h) = image.dimensions();
        let mut buffer = Cursor::new(Vec::new());
        let written = if w.max(h) > self.max_size {
            image
                .thumbnail(self.max_size, self.max_size)
                .write_to(&mut buffer, ImageFormat::Png)
        } else {
            image.write_to(&mut buffer, ImageFormat::Png)
        };
        if let Err(e) = written {
            tracing::debug!("Preview encoding failed: {e}");
            return None;
        }

        Some(format!(
            "data:image/png;base64,{}",
            BASE64.encode(buffer.into_inner())
        ))
    }

    /// Attach named previews under `extra.images`. A no-op when disabled.
    pub fn attach(&self, outcome: AnalysisOutcome, images: &[(&str, &DynamicImage)]) -> AnalysisOutcome {
        if !self.enabled || images.is_empty() {
            return outcome;
        }
        let mut map = Map::new();
        for (name, image) in images {
            if let Some(url) = self.data_url(image) {
                map.insert((*name).to_string(), Value::String(url));
            }
        }
        if map.is_empty() {
            return outcome;
        }
        outcome.with_extra(IMAGES_KEY, map)
    }
}
