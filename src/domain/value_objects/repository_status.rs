use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::schema::Value;
use crate::domain::stores::StoreError;

/// Ingestion state shared by `Repository.status` and `Log.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RepositoryStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

impl RepositoryStatus {
    pub const VARIANTS: &'static [&'static str] = &["PENDING", "PROCESSING", "SUCCESS", "FAILED"];

    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryStatus::Pending => "PENDING",
            RepositoryStatus::Processing => "PROCESSING",
            RepositoryStatus::Success => "SUCCESS",
            RepositoryStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RepositoryStatus::Success | RepositoryStatus::Failed)
    }

    pub fn can_transition_to(&self, new_status: &RepositoryStatus) -> bool {
        matches!(
            (self, new_status),
            (RepositoryStatus::Pending, RepositoryStatus::Processing)
                | (RepositoryStatus::Processing, RepositoryStatus::Success)
                | (RepositoryStatus::Processing, RepositoryStatus::Failed)
                | (RepositoryStatus::Failed, RepositoryStatus::Pending)
        )
    }
}

impl Default for RepositoryStatus {
    fn default() -> Self {
        RepositoryStatus::Pending
    }
}

impl FromStr for RepositoryStatus {
    type Err = StoreError;

    /// Wire values are case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(RepositoryStatus::Pending),
            "PROCESSING" => Ok(RepositoryStatus::Processing),
            "SUCCESS" => Ok(RepositoryStatus::Success),
            "FAILED" => Ok(RepositoryStatus::Failed),
            _ => Err(StoreError::validation(format!(
                "Invalid repository status: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for RepositoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RepositoryStatus> for Value {
    fn from(status: RepositoryStatus) -> Self {
        Value::Text(status.as_str().to_string())
    }
}
