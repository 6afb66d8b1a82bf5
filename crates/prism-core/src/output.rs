//! Report output as JSON or JSON Lines.
//!
//! A single image in JSON mode is written as the bare report mapping, the
//! same shape [`run_pipeline`](crate::engine::run_pipeline) returns. Several
//! images are written as an array of runs, or one run per line in JSON Lines
//! mode.

use serde::Serialize;
use std::io::{self, Write};

use crate::engine::PipelineRun;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON document
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Serializes pipeline runs to a writer.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    runs_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// `pretty` only affects [`OutputFormat::Json`].
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            runs_written: 0,
        }
    }

    /// Write the results of one or more runs in the configured format.
    pub fn write_runs(&mut self, runs: &[PipelineRun]) -> io::Result<()> {
        match (self.format, runs) {
            (OutputFormat::Json, [run]) => self.write_document(&run.report)?,
            (OutputFormat::Json, _) => self.write_document(runs)?,
            (OutputFormat::JsonLines, _) => {
                for run in runs {
                    self.write_line(run)?;
                }
            }
        }
        self.runs_written += runs.len();
        Ok(())
    }

    /// Write one run as it completes. Only meaningful for JSON Lines.
    pub fn write_run(&mut self, run: &PipelineRun) -> io::Result<()> {
        match self.format {
            OutputFormat::JsonLines => self.write_line(run)?,
            OutputFormat::Json => self.write_document(run)?,
        }
        self.runs_written += 1;
        Ok(())
    }

    fn write_document<T: Serialize + ?Sized>(&mut self, item: &T) -> io::Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, item).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        }
        writeln!(self.writer)
    }

    fn write_line<T: Serialize + ?Sized>(&mut self, item: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        writeln!(self.writer)
    }

    pub fn runs_written(&self) -> usize {
        self.runs_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ConsolidatedReport, ResultItem};
    use crate::types::AnalysisOutcome;
    use serde_json::Value;
    use std::time::Duration;

    fn run(image: &str) -> PipelineRun {
        let mut report = ConsolidatedReport::new();
        report.add(ResultItem::ok(
            "M",
            AnalysisOutcome::failure("fine"),
            Duration::from_millis(1500),
        ));
        PipelineRun {
            image: image.to_string(),
            content_hash: None,
            total_seconds: 1.5,
            report,
        }
    }

    fn written(format: OutputFormat, pretty: bool, runs: &[PipelineRun]) -> String {
        let mut writer = OutputWriter::new(Vec::new(), format, pretty);
        writer.write_runs(runs).unwrap();
        assert_eq!(writer.runs_written(), runs.len());
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_single_json_is_bare_report() {
        let output = written(OutputFormat::Json, false, &[run("a.png")]);
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["M"]["status"], "OK");
        assert_eq!(value["M"]["dados"]["detalhe"], "fine");
        assert!(value.get("image").is_none());
    }

    #[test]
    fn test_multiple_json_is_array_of_runs() {
        let output = written(OutputFormat::Json, true, &[run("a.png"), run("b.png")]);
        assert!(output.starts_with('['));
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value[1]["image"], "b.png");
        assert_eq!(value[0]["report"]["M"]["time_taken"], 1.5);
    }

    #[test]
    fn test_jsonl_one_run_per_line() {
        let output = written(OutputFormat::JsonLines, true, &[run("a.png"), run("b.png")]);
        let lines: Vec<&str> = output.trim().split('\n').collect();
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["image"], "a.png");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("jsonl"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("NDJSON"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("yaml"), None);
    }
}
