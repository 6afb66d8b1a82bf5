//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::output::OutputFormat;

use super::Config;

/// Largest accepted `limits.max_file_size_mb` (1 TiB).
const MAX_FILE_SIZE_MB: u64 = 1024 * 1024;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_FILE_SIZE_MB).contains(&self.limits.max_file_size_mb) {
            return Err(ConfigError::ValidationError(format!(
                "limits.max_file_size_mb must be between 1 and {MAX_FILE_SIZE_MB}"
            )));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if !(2..=256).contains(&self.glcm.levels) {
            return Err(ConfigError::ValidationError(
                "glcm.levels must be between 2 and 256".into(),
            ));
        }
        if self.glcm.distance == 0 {
            return Err(ConfigError::ValidationError(
                "glcm.distance must be > 0".into(),
            ));
        }
        if self.glcm.angles_deg.is_empty() {
            return Err(ConfigError::ValidationError(
                "glcm.angles_deg must list at least one angle".into(),
            ));
        }
        if self.glcm.angles_deg.iter().any(|a| !a.is_finite()) {
            return Err(ConfigError::ValidationError(
                "glcm.angles_deg must be finite".into(),
            ));
        }
        if self.modules.preview_max_size == 0 {
            return Err(ConfigError::ValidationError(
                "modules.preview_max_size must be > 0".into(),
            ));
        }
        if OutputFormat::parse(&self.output.format).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "output.format must be \"json\" or \"jsonl\", got {:?}",
                self.output.format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_levels() {
        let mut config = Config::default();
        config.glcm.levels = 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("glcm.levels"));

        config.glcm.levels = 257;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("glcm.levels"));
    }

    #[test]
    fn test_validate_rejects_zero_distance() {
        let mut config = Config::default();
        config.glcm.distance = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("glcm.distance"));
    }

    #[test]
    fn test_validate_rejects_empty_angle_set() {
        let mut config = Config::default();
        config.glcm.angles_deg.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("angles_deg"));
    }

    #[test]
    fn test_validate_rejects_zero_file_limit() {
        let mut config = Config::default();
        config.limits.max_file_size_mb = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_file_size_mb"));
    }

    #[test]
    fn test_validate_rejects_oversized_file_limit() {
        let err = Config::from_toml("[limits]\nmax_file_size_mb = 9223372036854775807\n")
            .unwrap_err();
        assert!(err.to_string().contains("max_file_size_mb"));

        let mut config = Config::default();
        config.limits.max_file_size_mb = MAX_FILE_SIZE_MB;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_output_format() {
        let mut config = Config::default();
        config.output.format = "xml".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output.format"));
    }
}
