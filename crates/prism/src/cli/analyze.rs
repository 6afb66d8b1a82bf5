//! The `prism analyze` command.

use anyhow::Context;
use clap::{Args, ValueEnum};
use prism_core::{
    Config, Engine, ModuleRegistry, OutputFormat as CoreOutputFormat, OutputWriter, PipelineRun,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Arguments for the `analyze` command.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Image files to analyze
    #[arg(required = true)]
    pub images: Vec<String>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (defaults to `output.format` from the config)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output
    #[arg(long, conflicts_with = "compact")]
    pub pretty: bool,

    /// Compact JSON output
    #[arg(long)]
    pub compact: bool,

    /// Maximum number of modules running at once (0 = one per core)
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Per-module deadline in milliseconds (0 = none)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Leave a module out of the run (repeatable)
    #[arg(long = "disable", value_name = "NAME")]
    pub disable: Vec<String>,

    /// Do not attach preview images to results
    #[arg(long)]
    pub no_images: bool,
}

/// Supported output formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON document
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Fold command-line overrides into the loaded configuration.
fn apply_overrides(args: &AnalyzeArgs, config: &mut Config) -> anyhow::Result<()> {
    if let Some(parallel) = args.parallel {
        config.pipeline.parallel_modules = parallel;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.pipeline.module_timeout_ms = timeout_ms;
    }
    if args.no_images {
        config.modules.include_images = false;
    }
    if args.pretty {
        config.output.pretty = true;
    }
    if args.compact {
        config.output.pretty = false;
    }
    for name in &args.disable {
        if !config.modules.disabled.contains(name) {
            config.modules.disabled.push(name.clone());
        }
    }
    config.validate()?;
    Ok(())
}

fn output_format(args: &AnalyzeArgs, config: &Config) -> anyhow::Result<CoreOutputFormat> {
    match args.format {
        Some(format) => Ok(format.into()),
        None => CoreOutputFormat::parse(&config.output.format)
            .with_context(|| format!("Unknown output format: {}", config.output.format)),
    }
}

fn open_sink(output: Option<&PathBuf>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => {
            let path = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
            let file = File::create(&path)
                .with_context(|| format!("Cannot create output file {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout().lock()),
    })
}

/// Execute the analyze command.
pub async fn execute(args: AnalyzeArgs, mut config: Config) -> anyhow::Result<()> {
    apply_overrides(&args, &mut config)?;
    let format = output_format(&args, &config)?;

    let known = ModuleRegistry::builtin(&Config::default());
    for name in args.disable.iter().filter(|name| !known.contains(name)) {
        tracing::warn!("--disable {name}: no built-in module has this name");
    }

    let engine = Engine::new(&config);
    if engine.registry().is_empty() {
        tracing::warn!("Every module is disabled; reports will be empty");
    }

    let mut writer = OutputWriter::new(open_sink(args.output.as_ref())?, format, config.output.pretty);
    let mut runs: Vec<PipelineRun> = Vec::new();
    let mut errors = 0;

    for reference in &args.images {
        let expanded = shellexpand::tilde(reference).into_owned();
        let run = engine.run_detailed(&expanded).await;
        errors += run.report.error_count();

        // JSON Lines output streams each run as soon as it is done.
        match format {
            CoreOutputFormat::JsonLines => writer.write_run(&run)?,
            CoreOutputFormat::Json => runs.push(run),
        }
    }
    if matches!(format, CoreOutputFormat::Json) {
        writer.write_runs(&runs)?;
    }
    writer.flush()?;

    tracing::info!(
        "Analyzed {} image(s) with {} module(s), {} module error(s)",
        args.images.len(),
        engine.registry().len(),
        errors
    );
    if let Some(path) = &args.output {
        tracing::info!("Report written to {}", path.display());
    }
    Ok(())
}
