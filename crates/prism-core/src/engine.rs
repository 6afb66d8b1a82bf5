//! Pipeline engine: runs every registered module against one image.
//!
//! The input is read once and shared read-only. Modules run as blocking tasks
//! bounded by a semaphore; each task's result and timing are collected on its
//! own and merged into the report in priority order. A module that errors,
//! panics or overruns its deadline becomes an `ERROR` item and the run
//! carries on.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::config::{Config, LimitsConfig, PipelineConfig};
use crate::error::PipelineError;
use crate::module::{AnalysisModule, ModuleInput};
use crate::registry::ModuleRegistry;
use crate::report::{round_millis, ConsolidatedReport, ResultItem, Status};
use crate::source::{ImageCrateSource, ImageSource};

/// Everything produced by one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    /// The image reference as given by the caller
    pub image: String,

    /// BLAKE3 hash of the input bytes, when they could be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,

    /// Wall-clock duration of the whole run
    #[serde(serialize_with = "serialize_seconds")]
    pub total_seconds: f64,

    /// Per-module results
    pub report: ConsolidatedReport,
}

fn serialize_seconds<S: serde::Serializer>(seconds: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(round_millis(*seconds))
}

/// The analysis engine.
pub struct Engine {
    registry: ModuleRegistry,
    source: Arc<dyn ImageSource>,
    pipeline: PipelineConfig,
    limits: LimitsConfig,
}

impl Engine {
    /// Engine with every built-in module enabled by `config`.
    pub fn new(config: &Config) -> Self {
        Self::with_registry(ModuleRegistry::builtin(config), config)
    }

    /// Engine over a caller-supplied registry.
    pub fn with_registry(registry: ModuleRegistry, config: &Config) -> Self {
        Self {
            registry,
            source: Arc::new(ImageCrateSource::new(config.limits.clone())),
            pipeline: config.pipeline.clone(),
            limits: config.limits.clone(),
        }
    }

    /// Replace the image decoder handed to modules.
    pub fn with_source(mut self, source: Arc<dyn ImageSource>) -> Self {
        self.source = source;
        self
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Run every module and return the consolidated report.
    ///
    /// Never fails: an empty reference yields an empty report, and every
    /// other problem is recorded against the module it affected.
    pub async fn run(&self, reference: &str) -> ConsolidatedReport {
        self.run_detailed(reference).await.report
    }

    /// Like [`Engine::run`], with run-level metadata.
    pub async fn run_detailed(&self, reference: &str) -> PipelineRun {
        let start = Instant::now();

        if reference.trim().is_empty() {
            tracing::error!("Invalid image reference: empty path");
            return PipelineRun {
                image: reference.to_string(),
                content_hash: None,
                total_seconds: 0.0,
                report: ConsolidatedReport::new(),
            };
        }

        tracing::info!("Analyzing {}", reference);
        let path = PathBuf::from(reference);
        if !path.exists() {
            tracing::warn!(
                "File {:?} not found; running modules anyway, they will report their own errors",
                path
            );
        }

        let bytes = self.read_input(&path).await;
        let content_hash = bytes.as_deref().map(content_hash);
        let input = ModuleInput::new(path, bytes, Arc::clone(&self.source));

        let report = self.execute(input).await;
        log_summary(&report);

        PipelineRun {
            image: reference.to_string(),
            content_hash,
            total_seconds: start.elapsed().as_secs_f64(),
            report,
        }
    }

    /// Read the whole input once. Any failure leaves modules without bytes.
    async fn read_input(&self, path: &Path) -> Option<Arc<[u8]>> {
        let metadata = tokio::fs::metadata(path).await.ok()?;
        let max_bytes = self.limits.max_file_size_mb.saturating_mul(1024 * 1024);
        if metadata.len() > max_bytes {
            let err = PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: metadata.len() / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            };
            tracing::warn!("{err}; continuing without input bytes");
            return None;
        }

        match tokio::fs::read(path).await {
            Ok(bytes) => Some(Arc::from(bytes)),
            Err(e) => {
                tracing::warn!("Cannot read {:?}: {e}; continuing without input bytes", path);
                None
            }
        }
    }

    async fn execute(&self, input: ModuleInput) -> ConsolidatedReport {
        let workers = self.pipeline.effective_workers();
        let timeout_ms = self.pipeline.module_timeout_ms;
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut handles = Vec::with_capacity(self.registry.len());

        tracing::debug!(
            "Running {} module(s) with {} worker(s)",
            self.registry.len(),
            workers
        );

        // Permits are taken in priority order, so a single worker gives a
        // strictly sequential run.
        for module in self.registry.all() {
            let permit = semaphore.clone().acquire_owned().await;
            let module = Arc::clone(module);
            let input = input.clone();
            let name = module.name().to_string();

            let handle = tokio::spawn(async move {
                let _permit = permit.ok();
                run_module(module, input, timeout_ms).await
            });
            handles.push((name, handle));
        }

        let mut report = ConsolidatedReport::new();
        for (name, handle) in handles {
            let item = match handle.await {
                Ok(item) => item,
                Err(e) => {
                    tracing::error!("Task for module {name} failed: {e}");
                    ResultItem::error(name, format!("module task failed: {e}"), Duration::ZERO)
                }
            };
            report.add(item);
        }
        report
    }
}

/// Run one module on a blocking worker and turn whatever happens into an item.
async fn run_module(
    module: Arc<dyn AnalysisModule>,
    input: ModuleInput,
    timeout_ms: u64,
) -> ResultItem {
    let name = module.name().to_string();
    tracing::debug!("Running module: {}", name);
    let start = Instant::now();

    let task = tokio::task::spawn_blocking(move || module.process(&input));
    let joined = if timeout_ms > 0 {
        match tokio::time::timeout(Duration::from_millis(timeout_ms), task).await {
            Ok(joined) => joined,
            Err(_) => {
                let err = PipelineError::Timeout {
                    stage: name.clone(),
                    timeout_ms,
                };
                tracing::warn!("{err}");
                return ResultItem::error(name, err.to_string(), start.elapsed());
            }
        }
    } else {
        task.await
    };
    let elapsed = start.elapsed();

    match joined {
        Ok(Ok(output)) => {
            tracing::debug!("Module {} finished in {:?}", name, elapsed);
            ResultItem::ok(name, output.into_outcome(), elapsed)
        }
        Ok(Err(e)) => {
            tracing::warn!("Module {} failed: {e}", name);
            ResultItem::error(name, e.to_string(), elapsed)
        }
        Err(e) => {
            let message = if e.is_panic() {
                format!("module panicked: {}", panic_message(e.into_panic()))
            } else {
                format!("module task cancelled: {e}")
            };
            tracing::error!("Module {}: {message}", name);
            ResultItem::error(name, message, elapsed)
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// BLAKE3 hash of the input bytes, hex-encoded.
pub fn content_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Log the per-module outcome of a run, in report order.
fn log_summary(report: &ConsolidatedReport) {
    tracing::info!(
        "Run summary: {} module(s), {} OK, {} ERROR, {:.2}s in modules",
        report.len(),
        report.ok_count(),
        report.error_count(),
        report.total_module_seconds()
    );
    for item in report {
        match item.status() {
            Status::Ok => {
                match item.outcome().and_then(|o| o.detail.as_deref()) {
                    Some(detail) => tracing::info!(
                        "[OK] {} -> {:.2}s | {}",
                        item.module(),
                        item.elapsed_seconds(),
                        detail
                    ),
                    None => {
                        tracing::info!("[OK] {} -> {:.2}s", item.module(), item.elapsed_seconds())
                    }
                }
            }
            Status::Error => tracing::warn!(
                "[ERROR] {} -> {} ({:.2}s)",
                item.module(),
                item.error_message().unwrap_or_default(),
                item.elapsed_seconds()
            ),
        }
    }
}

/// Pipeline invocation boundary: run `engine` on `reference` and return the
/// serialized report, `{module: {status, dados?, msg?, time_taken}}`.
pub async fn run_pipeline(engine: &Engine, reference: &str) -> serde_json::Value {
    engine.run(reference).await.to_value()
}
