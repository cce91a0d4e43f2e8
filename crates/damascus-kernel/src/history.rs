//! Append-only audit log of operator invocations.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::stats::{BilletInfo, BilletStats};

/// Named numeric values (parameters or statistics).
pub type ParamMap = BTreeMap<String, f64>;

/// Build a [`ParamMap`] from `(name, value)` pairs.
pub fn param_map(pairs: &[(&str, f64)]) -> ParamMap {
    pairs.iter().map(|&(k, v)| (k.to_string(), v)).collect()
}

/// One billet-level history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    /// Operation name, e.g. `wedge_deformation` or `forge_square`.
    #[serde(rename = "operationName")]
    pub operation: String,
    /// When the call finished.
    pub timestamp: DateTime<Utc>,
    /// Input parameters.
    pub parameters: ParamMap,
    /// Wall-clock duration of the call.
    pub duration_seconds: f64,
    /// Computed statistics.
    pub stats: ParamMap,
    /// Operation this entry acts on, set for `undo`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl OperationRecord {
    /// Create a record stamped with the current time.
    pub fn new(
        operation: impl Into<String>,
        parameters: ParamMap,
        duration_seconds: f64,
        stats: ParamMap,
    ) -> Self {
        Self {
            operation: operation.into(),
            timestamp: Utc::now(),
            parameters,
            duration_seconds,
            stats,
            target: None,
        }
    }

    /// Name the operation this entry acts on.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// Ordered, append-only list of [`OperationRecord`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationHistory {
    records: Vec<OperationRecord>,
}

impl OperationHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&mut self, record: OperationRecord) {
        self.records.push(record);
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[OperationRecord] {
        &self.records
    }

    /// Most recent record.
    pub fn last(&self) -> Option<&OperationRecord> {
        self.records.last()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records with the given operation name.
    pub fn by_name<'a>(&'a self, operation: &'a str) -> impl Iterator<Item = &'a OperationRecord> {
        self.records.iter().filter(move |r| r.operation == operation)
    }
}

/// The document handed to external serializers: billet summary, the full
/// operation history and a final statistics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationLog {
    /// Billet dimensions at export time.
    pub billet_info: BilletInfo,
    /// Every recorded operation.
    pub operations: Vec<OperationRecord>,
    /// Full statistics snapshot.
    pub final_stats: BilletStats,
}

impl OperationLog {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a previously written log.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write pretty-printed JSON to `path`.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_map() {
        let map = param_map(&[("depth", 18.0), ("angle", 35.0)]);
        assert_eq!(map.len(), 2);
        assert_eq!(map["depth"], 18.0);
    }

    #[test]
    fn test_history_append_and_filter() {
        let mut history = OperationHistory::new();
        assert!(history.is_empty());
        history.push(OperationRecord::new("twist", ParamMap::new(), 0.0, ParamMap::new()));
        history.push(OperationRecord::new("compression", ParamMap::new(), 0.0, ParamMap::new()));
        history.push(OperationRecord::new("twist", ParamMap::new(), 0.0, ParamMap::new()));
        assert_eq!(history.len(), 3);
        assert_eq!(history.by_name("twist").count(), 2);
        assert_eq!(history.last().unwrap().operation, "twist");
    }

    #[test]
    fn test_record_serializes_with_export_field_names() {
        let record = OperationRecord::new(
            "drill_hole",
            param_map(&[("radius", 6.0)]),
            0.25,
            param_map(&[("vertices_affected", 4.0)]),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["operationName"], "drill_hole");
        assert_eq!(json["durationSeconds"], 0.25);
        assert_eq!(json["parameters"]["radius"], 6.0);
        assert_eq!(json["stats"]["vertices_affected"], 4.0);
        // RFC 3339 / ISO-8601 timestamp string
        let ts = json["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
        assert!(json.get("target").is_none());
    }

    #[test]
    fn test_target_round_trips() {
        let record = OperationRecord::new("undo", ParamMap::new(), 0.0, ParamMap::new())
            .with_target("compression");
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""target":"compression""#));
        let back: OperationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
