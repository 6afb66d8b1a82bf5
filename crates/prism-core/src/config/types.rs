//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// Engine scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum modules executing at once. 0 = one per available core,
    /// 1 = strictly sequential in priority order.
    pub parallel_modules: usize,

    /// Per-module deadline in milliseconds (0 disables the deadline)
    pub module_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parallel_modules: 0,
            module_timeout_ms: 0,
        }
    }
}

impl PipelineConfig {
    /// Resolve the configured worker count, mapping 0 to the core count.
    pub fn effective_workers(&self) -> usize {
        if self.parallel_modules > 0 {
            self.parallel_modules
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 10000,
        }
    }
}

/// GLCM texture analysis parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlcmConfig {
    /// Pixel distance between the reference pixel and its neighbor
    pub distance: u32,

    /// Angles in degrees at which co-occurrences are counted
    pub angles_deg: Vec<f64>,

    /// Number of quantized gray levels (2..=256)
    pub levels: usize,
}

impl Default for GlcmConfig {
    fn default() -> Self {
        Self {
            distance: 1,
            angles_deg: vec![0.0, 45.0, 90.0, 135.0],
            levels: 64,
        }
    }
}

/// Built-in module selection and visualization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulesConfig {
    /// Names of built-in modules to leave out of the registry
    pub disabled: Vec<String>,

    /// Attach PNG data-URL previews to module results
    pub include_images: bool,

    /// Longest edge of attached previews, in pixels
    pub preview_max_size: u32,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            disabled: Vec::new(),
            include_images: true,
            preview_max_size: 512,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
