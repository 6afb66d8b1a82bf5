//! Per-run report: one [`ResultItem`] per module, keyed by module name.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;

use crate::types::AnalysisOutcome;

/// Final status of one module run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR")]
    Error,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Ok => write!(f, "OK"),
            Status::Error => write!(f, "ERROR"),
        }
    }
}

/// Result of running one module.
///
/// The outcome is present iff the status is `OK`, the error message iff it is
/// `ERROR`. Elapsed time is always recorded.
#[derive(Debug, Clone, Serialize)]
pub struct ResultItem {
    #[serde(skip)]
    module: String,

    status: Status,

    #[serde(rename = "dados", skip_serializing_if = "Option::is_none")]
    outcome: Option<AnalysisOutcome>,

    #[serde(rename = "msg", skip_serializing_if = "Option::is_none")]
    error: Option<String>,

    #[serde(rename = "time_taken", serialize_with = "serialize_seconds")]
    elapsed_seconds: f64,
}

impl ResultItem {
    /// A successful module run.
    pub fn ok(module: impl Into<String>, outcome: AnalysisOutcome, elapsed: Duration) -> Self {
        Self {
            module: module.into(),
            status: Status::Ok,
            outcome: Some(outcome),
            error: None,
            elapsed_seconds: elapsed.as_secs_f64(),
        }
    }

    /// A failed module run. An empty message is replaced so the item always
    /// says something.
    pub fn error(module: impl Into<String>, message: impl Into<String>, elapsed: Duration) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "unknown error".to_string();
        }
        Self {
            module: module.into(),
            status: Status::Error,
            outcome: None,
            error: Some(message),
            elapsed_seconds: elapsed.as_secs_f64(),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    pub fn outcome(&self) -> Option<&AnalysisOutcome> {
        self.outcome.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }
}

/// Seconds rounded to millisecond precision.
fn serialize_seconds<S: Serializer>(seconds: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_millis(*seconds))
}

pub(crate) fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

/// Mapping from module name to its [`ResultItem`].
///
/// Items are kept in the order they were produced. Adding an item whose
/// module name is already present replaces the earlier item in place.
#[derive(Debug, Clone, Default)]
pub struct ConsolidatedReport {
    items: Vec<ResultItem>,
}

impl ConsolidatedReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item, replacing any earlier item for the same module.
    pub fn add(&mut self, item: ResultItem) {
        match self.items.iter_mut().find(|i| i.module == item.module) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    pub fn get(&self, module: &str) -> Option<&ResultItem> {
        self.items.iter().find(|i| i.module == module)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in production order.
    pub fn iter(&self) -> impl Iterator<Item = &ResultItem> {
        self.items.iter()
    }

    pub fn ok_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_ok()).count()
    }

    pub fn error_count(&self) -> usize {
        self.items.len() - self.ok_count()
    }

    /// Sum of per-module elapsed times.
    pub fn total_module_seconds(&self) -> f64 {
        self.items.iter().map(|i| i.elapsed_seconds).sum()
    }

    /// The serialized form handed to collaborators.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::Value::Object(Default::default()))
    }
}

impl Serialize for ConsolidatedReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.items.len()))?;
        for item in &self.items {
            map.serialize_entry(&item.module, item)?;
        }
        map.end()
    }
}

impl<'a> IntoIterator for &'a ConsolidatedReport {
    type Item = &'a ResultItem;
    type IntoIter = std::slice::Iter<'a, ResultItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_item_serialization() {
        let outcome = AnalysisOutcome::new().with_detail("ok");
        let item = ResultItem::ok("A", outcome, Duration::from_micros(12_345_678));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json,
            json!({"status": "OK", "dados": {"detalhe": "ok"}, "time_taken": 12.346})
        );
    }

    #[test]
    fn test_error_item_serialization() {
        let item = ResultItem::error("B", "x", Duration::from_millis(5));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, json!({"status": "ERROR", "msg": "x", "time_taken": 0.005}));
        assert!(item.outcome().is_none());
    }

    #[test]
    fn test_empty_error_message_replaced() {
        let item = ResultItem::error("B", "  ", Duration::ZERO);
        assert_eq!(item.error_message(), Some("unknown error"));
    }

    #[test]
    fn test_report_last_write_wins() {
        let mut report = ConsolidatedReport::new();
        report.add(ResultItem::error("A", "first", Duration::ZERO));
        report.add(ResultItem::ok("B", AnalysisOutcome::new(), Duration::ZERO));
        report.add(ResultItem::ok("A", AnalysisOutcome::new(), Duration::ZERO));

        assert_eq!(report.len(), 2);
        assert!(report.get("A").unwrap().is_ok());
        let order: Vec<&str> = report.iter().map(|i| i.module()).collect();
        assert_eq!(order, vec!["A", "B"]);
    }

    #[test]
    fn test_report_counts() {
        let mut report = ConsolidatedReport::new();
        report.add(ResultItem::ok("A", AnalysisOutcome::new(), Duration::from_millis(10)));
        report.add(ResultItem::error("B", "x", Duration::from_millis(20)));
        assert_eq!(report.ok_count(), 1);
        assert_eq!(report.error_count(), 1);
        assert!((report.total_module_seconds() - 0.03).abs() < 1e-9);
    }

    #[test]
    fn test_report_serializes_as_map() {
        let mut report = ConsolidatedReport::new();
        report.add(ResultItem::error("B", "x", Duration::ZERO));
        let value = report.to_value();
        assert_eq!(value["B"]["status"], json!("ERROR"));
        assert_eq!(value["B"]["msg"], json!("x"));
        assert_eq!(value["B"]["time_taken"], json!(0.0));
    }

    #[test]
    fn test_empty_report_serializes_as_empty_map() {
        assert_eq!(ConsolidatedReport::new().to_value(), json!({}));
    }
}
