use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named replication task definition, immutable once deployed.
///
/// Full-load and CDC variants of the same logical stream share a
/// `job_checkpoint_name`, which is what lets the CDC job resume where the
/// full load stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    pub job_name: String,
    pub job_checkpoint_name: String,
    pub migration_type: MigrationType,
    pub source_endpoint_id: String,
    pub target_endpoint_id: String,
}

/// Replication mode of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MigrationType {
    #[serde(rename = "full-load-and-cdc")]
    FullLoadAndCdc,
    #[serde(rename = "cdc")]
    Cdc,
}

impl MigrationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullLoadAndCdc => "full-load-and-cdc",
            Self::Cdc => "cdc",
        }
    }

    /// Start operation the task must be launched with
    pub fn start_operation(&self) -> StartReplicationTaskType {
        match self {
            Self::FullLoadAndCdc => StartReplicationTaskType::ReloadTarget,
            Self::Cdc => StartReplicationTaskType::StartReplication,
        }
    }

    /// CDC tasks resume from a stored checkpoint and stop at a bounded cutoff
    pub fn requires_checkpoint(&self) -> bool {
        matches!(self, Self::Cdc)
    }
}

impl fmt::Display for MigrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full-load-and-cdc" => Ok(Self::FullLoadAndCdc),
            "cdc" => Ok(Self::Cdc),
            other => Err(format!("Unsupported migration type: {other}")),
        }
    }
}

/// How a created task is started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StartReplicationTaskType {
    #[serde(rename = "reload-target")]
    ReloadTarget,
    #[serde(rename = "start-replication")]
    StartReplication,
}

impl StartReplicationTaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReloadTarget => "reload-target",
            Self::StartReplication => "start-replication",
        }
    }
}

impl fmt::Display for StartReplicationTaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
