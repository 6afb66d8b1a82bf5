//! Image source adapter: turns raw bytes into decoded pixel data.
//!
//! Decoding itself is delegated to the `image` crate. The engine never
//! decodes; each module asks its [`ModuleInput`](crate::module::ModuleInput)
//! for a private decoded copy.

use image::{DynamicImage, GenericImageView};
use std::io::Cursor;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Decoding capability injected into the engine.
pub trait ImageSource: Send + Sync {
    /// Decode an encoded image held in memory.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, PipelineError>;
}

/// [`ImageSource`] backed by the `image` crate, with dimension limits.
pub struct ImageCrateSource {
    limits: LimitsConfig,
}

impl ImageCrateSource {
    /// Create a new source with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }
}

impl Default for ImageCrateSource {
    fn default() -> Self {
        Self::new(LimitsConfig::default())
    }
}

impl ImageSource for ImageCrateSource {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::Decode {
                message: "no image data".to_string(),
            });
        }

        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::Decode {
                message: format!("Cannot detect image format: {}", e),
            })?;
        if reader.format().is_none() {
            return Err(PipelineError::Decode {
                message: "Unrecognized image format".to_string(),
            });
        }
        let image = reader.decode().map_err(|e| PipelineError::Decode {
            message: e.to_string(),
        })?;

        let (width, height) = image.dimensions();
        if width > self.limits.max_image_dimension || height > self.limits.max_image_dimension {
            return Err(PipelineError::ImageTooLarge {
                width,
                height,
                max_dim: self.limits.max_image_dimension,
            });
        }
        Ok(image)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat, Luma};

    /// Encode a grayscale image as PNG bytes.
    pub(crate) fn png_bytes(image: &GrayImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_decode_png_round_trip() {
        let img = GrayImage::from_pixel(8, 4, Luma([77]));
        let decoded = ImageCrateSource::default().decode(&png_bytes(&img)).unwrap();
        assert_eq!(decoded.dimensions(), (8, 4));
        assert_eq!(decoded.to_luma8().get_pixel(3, 2)[0], 77);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = ImageCrateSource::default()
            .decode(b"definitely not an image")
            .unwrap_err();
        assert!(matches!(err, PipelineError::Decode { .. }));
    }

    #[test]
    fn test_decode_rejects_empty() {
        let err = ImageCrateSource::default().decode(&[]).unwrap_err();
        assert!(err.to_string().contains("no image data"));
    }

    #[test]
    fn test_decode_enforces_dimension_limit() {
        let source = ImageCrateSource::new(LimitsConfig {
            max_file_size_mb: 1,
            max_image_dimension: 4,
        });
        let img = GrayImage::new(8, 2);
        let err = source.decode(&png_bytes(&img)).unwrap_err();
        assert!(matches!(err, PipelineError::ImageTooLarge { width: 8, .. }));
    }
}
