//! Trial Record - what happened during one trial

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::trial_id::{LogKind, TrialId};

/// Outcome of scraping one tool's log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialStatus {
    /// No log was found.
    #[default]
    Unknown,
    /// The log yielded the expected values.
    Success,
    /// The log reports an error, or could not be read.
    Error,
    /// The log exists but holds no final statistics yet.
    Running,
}

impl TrialStatus {
    /// Lowercase name used in logs and the JSON sidecar.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Success => "success",
            Self::Error => "error",
            Self::Running => "running",
        }
    }
}

impl fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trial Record keeps the provenance of one result row.
///
/// Serialized into the JSON sidecar next to the result table so a row can
/// be traced back to the strategy and statuses that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrialRecord {
    trial_id: TrialId,
    sweep_point: String,
    started_at: Option<DateTime<Local>>,
    ended_at: Option<DateTime<Local>>,
    statuses: BTreeMap<LogKind, TrialStatus>,
    strategies: BTreeMap<LogKind, String>,
    messages: Vec<String>,
}

impl TrialRecord {
    /// Create a record with no statuses.
    #[must_use]
    pub fn new(trial_id: TrialId, sweep_point: impl Into<String>) -> Self {
        Self {
            trial_id,
            sweep_point: sweep_point.into(),
            started_at: None,
            ended_at: None,
            statuses: BTreeMap::new(),
            strategies: BTreeMap::new(),
            messages: Vec::new(),
        }
    }

    /// Create a builder for constructing a record with optional fields.
    #[must_use]
    pub fn builder(trial_id: TrialId, sweep_point: impl Into<String>) -> TrialRecordBuilder {
        TrialRecordBuilder::new(trial_id, sweep_point)
    }

    /// Get the trial ID.
    #[must_use]
    pub const fn trial_id(&self) -> &TrialId {
        &self.trial_id
    }

    /// Human-readable sweep parameters, e.g. `tx_cores=4 tx_desc=1024`.
    #[must_use]
    pub fn sweep_point(&self) -> &str {
        &self.sweep_point
    }

    /// When the trial's processes were launched.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    /// When the trial's processes were torn down.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Local>> {
        self.ended_at
    }

    /// Status for `kind`; [`TrialStatus::Unknown`] when never recorded.
    #[must_use]
    pub fn status(&self, kind: LogKind) -> TrialStatus {
        self.statuses.get(&kind).copied().unwrap_or_default()
    }

    /// All recorded statuses.
    #[must_use]
    pub const fn statuses(&self) -> &BTreeMap<LogKind, TrialStatus> {
        &self.statuses
    }

    /// Name of the strategy that produced `kind`'s packet totals.
    #[must_use]
    pub fn strategy(&self, kind: LogKind) -> Option<&str> {
        self.strategies.get(&kind).map(String::as_str)
    }

    /// Extractor diagnostics.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Mark the trial as started now.
    pub fn start(&mut self) {
        self.started_at = Some(Local::now());
    }

    /// Mark the trial as ended now.
    pub fn finish(&mut self) {
        self.ended_at = Some(Local::now());
    }

    /// Record `kind`'s status.
    pub fn set_status(&mut self, kind: LogKind, status: TrialStatus) {
        self.statuses.insert(kind, status);
    }

    /// Record the winning strategy for `kind`.
    pub fn set_strategy(&mut self, kind: LogKind, strategy: impl Into<String>) {
        self.strategies.insert(kind, strategy.into());
    }

    /// Append extractor diagnostics.
    pub fn extend_messages<I: IntoIterator<Item = String>>(&mut self, messages: I) {
        self.messages.extend(messages);
    }
}

/// Builder for `TrialRecord`.
#[derive(Debug)]
pub struct TrialRecordBuilder {
    record: TrialRecord,
}

impl TrialRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(trial_id: TrialId, sweep_point: impl Into<String>) -> Self {
        Self {
            record: TrialRecord::new(trial_id, sweep_point),
        }
    }

    /// Set the launch timestamp.
    #[must_use]
    pub fn started_at(mut self, at: DateTime<Local>) -> Self {
        self.record.started_at = Some(at);
        self
    }

    /// Set the teardown timestamp.
    #[must_use]
    pub fn ended_at(mut self, at: DateTime<Local>) -> Self {
        self.record.ended_at = Some(at);
        self
    }

    /// Set a tool status.
    #[must_use]
    pub fn status(mut self, kind: LogKind, status: TrialStatus) -> Self {
        self.record.set_status(kind, status);
        self
    }

    /// Build the `TrialRecord`.
    #[must_use]
    pub fn build(self) -> TrialRecord {
        self.record
    }
}
