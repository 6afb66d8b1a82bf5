//! Prism Core - modular image analysis pipeline.
//!
//! Prism takes one image reference, runs every registered analysis module
//! against it and consolidates their results into a single report. A module
//! that fails or panics is recorded as an `ERROR` entry; the others still run.
//!
//! # Architecture
//!
//! ```text
//! Reference → Read bytes → Modules (priority order, bounded concurrency) → Report → JSON
//! ```
//!
//! Each module decodes its own private copy of the image through an
//! [`ImageSource`]. Built-in modules cover GLCM texture statistics,
//! histograms, equalization, thresholding, Canny edge detection and shape
//! detection.
//!
//! # Usage
//!
//! ```rust,ignore
//! use prism_core::{Config, Engine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load()?;
//!     let engine = Engine::new(&config);
//!
//!     let report = engine.run("./image.png").await;
//!     println!("{}", serde_json::to_string_pretty(&report)?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod glcm;
pub mod imaging;
pub mod module;
pub mod modules;
pub mod output;
pub mod registry;
pub mod report;
pub mod source;
pub mod types;

pub use config::Config;
pub use engine::{run_pipeline, Engine, PipelineRun};
pub use error::{ConfigError, ModuleError, PipelineError, RegistryError};
pub use module::{AnalysisModule, ModuleInput, DEFAULT_PRIORITY};
pub use output::{OutputFormat, OutputWriter};
pub use registry::ModuleRegistry;
pub use report::{ConsolidatedReport, ResultItem, Status};
pub use source::{ImageCrateSource, ImageSource};
pub use types::{AnalysisOutcome, ModuleOutput};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
