//! Per-call diagnostics returned by every operator.
//!
//! Operators never write to a shared logger object. Each call hands back an
//! [`OperationReport`] carrying its computed statistics and any notes it
//! produced; the same notes are also emitted as `tracing` events.

use serde::Serialize;

use crate::history::ParamMap;

/// Severity of a diagnostic note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticLevel {
    /// Progress detail.
    Info,
    /// Advisory condition: the call still succeeded.
    Warning,
}

/// A single diagnostic note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Severity.
    pub level: DiagnosticLevel,
    /// Human-readable message.
    pub message: String,
}

/// Ordered collection of diagnostic notes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a progress note.
    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("{message}");
        self.entries.push(Diagnostic {
            level: DiagnosticLevel::Info,
            message,
        });
    }

    /// Record an advisory warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.entries.push(Diagnostic {
            level: DiagnosticLevel::Warning,
            message,
        });
    }

    /// Append all notes from `other`.
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    /// All notes in recording order.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Only the warnings.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warning)
    }

    /// Number of notes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of one operator call.
#[derive(Debug, Clone, Serialize)]
pub struct OperationReport {
    /// Operation name as written to the history.
    pub operation: String,
    /// Input parameters.
    pub parameters: ParamMap,
    /// Computed statistics.
    pub stats: ParamMap,
    /// Wall-clock duration of the call.
    pub duration_seconds: f64,
    /// Notes produced during the call.
    pub diagnostics: Diagnostics,
}

impl OperationReport {
    /// Look up a statistic by name.
    pub fn stat(&self, name: &str) -> Option<f64> {
        self.stats.get(name).copied()
    }
}

/// Min / max / mean of a set of displacement magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplacementStats {
    /// Smallest sample.
    pub min: f64,
    /// Largest sample.
    pub max: f64,
    /// Arithmetic mean.
    pub mean: f64,
}

impl DisplacementStats {
    /// Summarize samples; all zero when `samples` is empty.
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let (min, max, sum) = samples.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), &s| (min.min(s), max.max(s), sum + s),
        );
        Self {
            min,
            max,
            mean: sum / samples.len() as f64,
        }
    }

    /// Write `{prefix}_min`, `{prefix}_max` and `{prefix}_mean` into `map`.
    pub fn write_into(&self, prefix: &str, map: &mut ParamMap) {
        map.insert(format!("{prefix}_min"), self.min);
        map.insert(format!("{prefix}_max"), self.max);
        map.insert(format!("{prefix}_mean"), self.mean);
    }
}
