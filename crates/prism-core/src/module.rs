//! The analysis module contract.

use image::{DynamicImage, GrayImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{ModuleError, PipelineError};
use crate::imaging;
use crate::source::ImageSource;
use crate::types::ModuleOutput;

/// Priority of modules that don't ask for one: run after everything else.
pub const DEFAULT_PRIORITY: i32 = i32::MAX;

/// An independent unit of image analysis.
///
/// Implementations are built once, shared across pipeline runs and possibly
/// across threads, so they must not carry mutable state.
pub trait AnalysisModule: Send + Sync {
    /// Stable identifier, unique within a registry.
    fn name(&self) -> &str;

    /// Execution priority; lower runs earlier.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Analyze the input.
    ///
    /// Modules that only need the path or only the bytes simply ignore the
    /// other half of [`ModuleInput`].
    fn process(&self, input: &ModuleInput) -> Result<ModuleOutput, ModuleError>;
}

/// What every module receives: the resource reference, the bytes the engine
/// read up front (if any) and the decoder to turn them into pixels.
#[derive(Clone)]
pub struct ModuleInput {
    path: PathBuf,
    bytes: Option<Arc<[u8]>>,
    source: Arc<dyn ImageSource>,
}

impl ModuleInput {
    pub fn new(path: impl Into<PathBuf>, bytes: Option<Arc<[u8]>>, source: Arc<dyn ImageSource>) -> Self {
        Self {
            path: path.into(),
            bytes,
            source,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Shared raw bytes. Read-only; modules needing a mutable image decode
    /// their own copy.
    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    /// Decode a private copy of the image.
    ///
    /// Uses the pre-read bytes when present, otherwise reads the path.
    pub fn load_image(&self) -> Result<DynamicImage, PipelineError> {
        match self.bytes() {
            Some(bytes) if !bytes.is_empty() => self.source.decode(bytes),
            _ => {
                if !self.path.exists() {
                    return Err(PipelineError::FileNotFound(self.path.clone()));
                }
                let bytes = std::fs::read(&self.path).map_err(|e| PipelineError::Decode {
                    message: format!("Cannot read {}: {}", self.path.display(), e),
                })?;
                self.source.decode(&bytes)
            }
        }
    }

    /// Decode and convert to 8-bit luma with Rec. 601 weights.
    pub fn load_gray(&self) -> Result<GrayImage, PipelineError> {
        Ok(imaging::to_gray(&self.load_image()?))
    }
}

impl std::fmt::Debug for ModuleInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleInput")
            .field("path", &self.path)
            .field("bytes", &self.bytes.as_ref().map(|b| b.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tests::png_bytes;
    use crate::source::ImageCrateSource;
    use crate::types::AnalysisOutcome;
    use image::{Luma, Rgb, RgbImage};

    struct Plain;

    impl AnalysisModule for Plain {
        fn name(&self) -> &str {
            "plain"
        }

        fn process(&self, _input: &ModuleInput) -> Result<ModuleOutput, ModuleError> {
            Ok(AnalysisOutcome::new().into())
        }
    }

    fn source() -> Arc<dyn ImageSource> {
        Arc::new(ImageCrateSource::default())
    }

    #[test]
    fn test_default_priority_runs_last() {
        assert_eq!(Plain.priority(), DEFAULT_PRIORITY);
    }

    #[test]
    fn test_load_prefers_bytes() {
        let img = GrayImage::from_pixel(3, 3, Luma([9]));
        let bytes: Arc<[u8]> = png_bytes(&img).into();
        let input = ModuleInput::new("/does/not/exist.png", Some(bytes), source());
        let gray = input.load_gray().unwrap();
        assert_eq!(gray.get_pixel(1, 1)[0], 9);
    }

    #[test]
    fn test_load_gray_weights_color_like_rec601() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([255, 0, 0])));
        let input = crate::modules::tests::input_for(&img);
        assert_eq!(input.load_gray().unwrap().get_pixel(0, 0)[0], 76);
    }

    #[test]
    fn test_load_falls_back_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.png");
        std::fs::write(&path, png_bytes(&GrayImage::new(2, 5))).unwrap();

        let input = ModuleInput::new(&path, None, source());
        assert_eq!(input.load_gray().unwrap().dimensions(), (2, 5));
    }

    #[test]
    fn test_load_missing_path() {
        let input = ModuleInput::new("/does/not/exist.png", None, source());
        assert!(matches!(
            input.load_image(),
            Err(PipelineError::FileNotFound(_))
        ));
    }
}
