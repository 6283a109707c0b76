//! Evaluation job resources.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::page::Page;
use crate::resource::{Ref, Resource};

/// Lifecycle state of an evaluation job or of one benchmark within it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationJobState {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl EvaluationJobState {
    /// All states, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Running,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
    ];

    /// Returns the wire name of the state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further transitions are expected from this state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for EvaluationJobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown state name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown evaluation job state: {0}")]
pub struct UnknownStateError(pub String);

impl FromStr for EvaluationJobState {
    type Err = UnknownStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownStateError(s.to_string()))
    }
}

/// Model under evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    pub url: String,
    pub name: String,
}

/// One benchmark to run, with provider-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub id: String,
    pub provider_id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, serde_json::Value>,
}

/// Client-supplied definition of an evaluation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationJobConfig {
    pub model: ModelRef,
    #[serde(default)]
    pub benchmarks: Vec<BenchmarkConfig>,
    /// Run every benchmark of this collection in addition to `benchmarks`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<Ref>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_attempts: Option<u32>,
}

/// Progress of a single benchmark within a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkStatus {
    pub id: String,
    pub provider_id: String,
    pub state: EvaluationJobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BenchmarkStatus {
    /// A not-yet-started status for the given benchmark.
    #[must_use]
    pub fn pending(benchmark: &BenchmarkConfig) -> Self {
        Self {
            id: benchmark.id.clone(),
            provider_id: benchmark.provider_id.clone(),
            state: EvaluationJobState::Pending,
            started_at: None,
            completed_at: None,
            error: None,
        }
    }
}

/// Aggregate status of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationJobStatus {
    pub state: EvaluationJobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub benchmarks: Vec<BenchmarkStatus>,
}

/// A stored evaluation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationJobResource {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(flatten)]
    pub config: EvaluationJobConfig,
    pub status: EvaluationJobStatus,
}

impl EvaluationJobResource {
    /// Creates a pending job with one pending status per benchmark.
    #[must_use]
    pub fn new(resource: Resource, config: EvaluationJobConfig) -> Self {
        let benchmarks = config.benchmarks.iter().map(BenchmarkStatus::pending).collect();
        Self {
            resource,
            config,
            status: EvaluationJobStatus {
                state: EvaluationJobState::Pending,
                message: None,
                benchmarks,
            },
        }
    }

    /// Returns a copy without per-benchmark detail.
    #[must_use]
    pub fn summary(&self) -> Self {
        let mut job = self.clone();
        job.config.benchmarks.clear();
        job.status.benchmarks.clear();
        job
    }

    /// Replaces (or appends) the status entry for one benchmark.
    pub fn set_benchmark_status(&mut self, status: BenchmarkStatus) {
        match self
            .status
            .benchmarks
            .iter_mut()
            .find(|b| b.id == status.id && b.provider_id == status.provider_id)
        {
            Some(existing) => *existing = status,
            None => self.status.benchmarks.push(status),
        }
        self.resource.touch();
    }
}

/// Paged list of evaluation jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationJobResourceList {
    #[serde(flatten)]
    pub page: Page,
    pub items: Vec<EvaluationJobResource>,
}
