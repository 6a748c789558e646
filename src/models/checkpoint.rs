use crate::constants::LATEST_CHECKPOINT_JOB_START;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Second half of a checkpoint key: a run's start timestamp or the `latest` sentinel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobStart {
    Latest,
    At(String),
}

impl JobStart {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Latest => LATEST_CHECKPOINT_JOB_START,
            Self::At(timestamp) => timestamp,
        }
    }
}

impl From<&str> for JobStart {
    fn from(value: &str) -> Self {
        if value == LATEST_CHECKPOINT_JOB_START {
            Self::Latest
        } else {
            Self::At(value.to_string())
        }
    }
}

impl fmt::Display for JobStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobStart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStart {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(JobStart::from(raw.as_str()))
    }
}

/// Composite key of the checkpoint and metrics tables
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckpointKey {
    pub job_checkpoint_name: String,
    pub job_start: JobStart,
}

impl CheckpointKey {
    pub fn latest(job_checkpoint_name: impl Into<String>) -> Self {
        Self {
            job_checkpoint_name: job_checkpoint_name.into(),
            job_start: JobStart::Latest,
        }
    }

    pub fn at(job_checkpoint_name: impl Into<String>, job_start: impl Into<String>) -> Self {
        Self {
            job_checkpoint_name: job_checkpoint_name.into(),
            job_start: JobStart::At(job_start.into()),
        }
    }
}

/// Last known replication position of a stream, as written by the job that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub job_checkpoint_name: String,
    pub job_start: JobStart,
    pub job_name: String,
    /// Opaque, engine-specific position string
    pub checkpoint: String,
}

impl CheckpointRecord {
    pub fn key(&self) -> CheckpointKey {
        CheckpointKey {
            job_checkpoint_name: self.job_checkpoint_name.clone(),
            job_start: self.job_start.clone(),
        }
    }

    /// The two records every successful task write produces: one under the run's
    /// start timestamp and one overwriting `latest`.
    pub fn pair(
        job_checkpoint_name: &str,
        job_start: &str,
        job_name: &str,
        checkpoint: &str,
    ) -> [CheckpointRecord; 2] {
        let record = |start: JobStart| CheckpointRecord {
            job_checkpoint_name: job_checkpoint_name.to_string(),
            job_start: start,
            job_name: job_name.to_string(),
            checkpoint: checkpoint.to_string(),
        };
        [record(JobStart::At(job_start.to_string())), record(JobStart::Latest)]
    }
}

/// Informational task statistics, keyed like a timestamped checkpoint. Write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub job_checkpoint_name: String,
    pub job_start: String,
    pub job_name: String,
    /// Statistic names normalised to snake_case
    #[serde(flatten)]
    pub metrics: Map<String, Value>,
}

impl MetricsRecord {
    pub fn key(&self) -> CheckpointKey {
        CheckpointKey::at(self.job_checkpoint_name.clone(), self.job_start.clone())
    }
}
