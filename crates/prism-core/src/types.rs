//! Module result types.
//!
//! An [`AnalysisOutcome`] is what a module hands back on success. Modules that
//! assemble their results as loose JSON can return a [`ModuleOutput::Raw`]
//! instead; the engine normalizes it into an outcome.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which a raw object result carries its human-readable summary.
pub const DETAIL_KEY: &str = "detalhe";

/// Structured result of one analysis module.
///
/// All fields are optional; empty fields are left out of the serialized form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// Human-readable summary
    #[serde(
        rename = "detalhe",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub detail: Option<String>,

    /// Numeric and structured results
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metrics: Map<String, Value>,

    /// Auxiliary payloads such as rendered previews
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl AnalysisOutcome {
    /// Create an empty outcome.
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcome carrying only a summary, used when a module recovers from a
    /// problem locally and has no metrics to report.
    pub fn failure(detail: impl Into<String>) -> Self {
        Self::new().with_detail(detail)
    }

    /// Set the summary.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Add a metric.
    pub fn with_metric(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metrics.insert(key.into(), value.into());
        self
    }

    /// Add an auxiliary payload.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Look up a metric as `f64`.
    pub fn metric_f64(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).and_then(Value::as_f64)
    }

    /// True if nothing at all was reported.
    pub fn is_empty(&self) -> bool {
        self.detail.is_none() && self.metrics.is_empty() && self.extra.is_empty()
    }
}

/// What a module returns from `process`.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleOutput {
    /// A typed outcome, used unchanged
    Outcome(AnalysisOutcome),
    /// A loose JSON value, normalized by [`ModuleOutput::into_outcome`]
    Raw(Value),
}

impl ModuleOutput {
    /// Normalize into an [`AnalysisOutcome`].
    ///
    /// - a typed outcome passes through untouched;
    /// - a JSON object has its `detalhe` (or `detail`) entry lifted into the
    ///   summary and every other entry placed in `extra`;
    /// - any other value lands in `extra.value`.
    pub fn into_outcome(self) -> AnalysisOutcome {
        match self {
            ModuleOutput::Outcome(outcome) => outcome,
            ModuleOutput::Raw(Value::Object(mut map)) => {
                let detail = map
                    .remove(DETAIL_KEY)
                    .or_else(|| map.remove("detail"))
                    .and_then(|v| match v {
                        Value::Null => None,
                        Value::String(s) => Some(s),
                        other => Some(other.to_string()),
                    });
                AnalysisOutcome {
                    detail,
                    metrics: Map::new(),
                    extra: map,
                }
            }
            ModuleOutput::Raw(other) => AnalysisOutcome::new().with_extra("value", other),
        }
    }
}

impl From<AnalysisOutcome> for ModuleOutput {
    fn from(outcome: AnalysisOutcome) -> Self {
        ModuleOutput::Outcome(outcome)
    }
}

impl From<Value> for ModuleOutput {
    fn from(value: Value) -> Self {
        ModuleOutput::Raw(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_fields_are_omitted() {
        let json = serde_json::to_value(AnalysisOutcome::new()).unwrap();
        assert_eq!(json, json!({}));

        let json = serde_json::to_value(AnalysisOutcome::failure("no pixels")).unwrap();
        assert_eq!(json, json!({"detalhe": "no pixels"}));
    }

    #[test]
    fn test_builder_populates_sections() {
        let outcome = AnalysisOutcome::new()
            .with_detail("ok")
            .with_metric("bins", json!([22, 45, 78]))
            .with_extra("note", "x");
        assert_eq!(outcome.detail.as_deref(), Some("ok"));
        assert_eq!(outcome.metrics["bins"], json!([22, 45, 78]));
        assert_eq!(outcome.extra["note"], json!("x"));
        assert!(!outcome.is_empty());
    }

    #[test]
    fn test_typed_outcome_passes_through() {
        let outcome = AnalysisOutcome::new().with_metric("energy", 0.5);
        let normalized = ModuleOutput::from(outcome.clone()).into_outcome();
        assert_eq!(normalized, outcome);
    }

    #[test]
    fn test_raw_object_lifts_detail() {
        let raw = json!({"detalhe": "ok", "count": 3});
        let outcome = ModuleOutput::from(raw).into_outcome();
        assert_eq!(outcome.detail.as_deref(), Some("ok"));
        assert!(outcome.metrics.is_empty());
        assert_eq!(outcome.extra.get("count"), Some(&json!(3)));
        assert!(!outcome.extra.contains_key("detalhe"));
    }

    #[test]
    fn test_raw_object_without_detail() {
        let outcome = ModuleOutput::from(json!({"a": 1})).into_outcome();
        assert!(outcome.detail.is_none());
        assert_eq!(outcome.extra.get("a"), Some(&json!(1)));
    }

    #[test]
    fn test_raw_scalar_wrapped_under_value() {
        let outcome = ModuleOutput::from(json!(42)).into_outcome();
        assert_eq!(outcome.extra.get("value"), Some(&json!(42)));
        assert!(outcome.detail.is_none());
    }

    #[test]
    fn test_metric_f64_lookup() {
        let outcome = AnalysisOutcome::new().with_metric("contrast", 2.5);
        assert_eq!(outcome.metric_f64("contrast"), Some(2.5));
        assert_eq!(outcome.metric_f64("missing"), None);
    }
}
