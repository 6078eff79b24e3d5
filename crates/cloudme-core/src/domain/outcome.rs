//! Stage outcome model.
//!
//! A slot carries one of these between stages. Unlike a bare boolean, a
//! failure keeps its classification and message so the final report can say
//! why a service did not deploy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CloudmeError;

/// Why a stage did not succeed.
///
/// Serialized as SCREAMING_SNAKE_CASE for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Build context could not be packaged.
    Packaging,

    /// The runtime adapter call failed.
    StageExecution,

    /// The predecessor stage failed; this stage did no work.
    UpstreamFailed,

    /// Waiting for the predecessor exceeded the deadline.
    Timeout,

    /// The pipeline was cancelled.
    Cancelled,

    /// The owning task ended without publishing.
    Abandoned,
}

/// Failure detail attached to a failed outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl StageFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&CloudmeError> for StageFailure {
    fn from(err: &CloudmeError) -> Self {
        let kind = match err {
            CloudmeError::Packaging { .. } => FailureKind::Packaging,
            _ => FailureKind::StageExecution,
        };
        Self::new(kind, err.to_string())
    }
}

/// Terminal value of a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageOutcome {
    Succeeded { at: DateTime<Utc> },
    Failed { at: DateTime<Utc>, failure: StageFailure },
}

impl StageOutcome {
    pub fn success() -> Self {
        Self::Succeeded { at: Utc::now() }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed {
            at: Utc::now(),
            failure: StageFailure::new(kind, message),
        }
    }

    pub fn from_result(result: &Result<(), CloudmeError>) -> Self {
        match result {
            Ok(()) => Self::success(),
            Err(e) => Self::Failed {
                at: Utc::now(),
                failure: StageFailure::from(e),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn failure_detail(&self) -> Option<&StageFailure> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed { failure, .. } => Some(failure),
        }
    }

    /// When the outcome was produced.
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::Succeeded { at } | Self::Failed { at, .. } => *at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Stage;

    #[test]
    fn failure_kind_serializes_as_screaming_snake() {
        let s = serde_json::to_string(&FailureKind::UpstreamFailed).unwrap();
        assert_eq!(s, "\"UPSTREAM_FAILED\"");
    }

    #[test]
    fn outcome_is_tagged_by_status() {
        let o = StageOutcome::failure(FailureKind::Timeout, "waited too long");
        let v = serde_json::to_value(&o).unwrap();
        assert_eq!(v["status"], "FAILED");
        assert_eq!(v["failure"]["kind"], "TIMEOUT");
        assert_eq!(v["failure"]["message"], "waited too long");
    }

    #[test]
    fn from_result_classifies_packaging_errors() {
        let err = CloudmeError::Packaging {
            path: "/tmp/ctx".into(),
            source: std::io::Error::other("disk full"),
        };
        let o = StageOutcome::from_result(&Err(err));
        assert_eq!(o.failure_detail().unwrap().kind, FailureKind::Packaging);

        let err = CloudmeError::StageExecution {
            stage: Stage::Run,
            service: "api".to_string(),
            message: "boom".to_string(),
        };
        let o = StageOutcome::from_result(&Err(err));
        let detail = o.failure_detail().unwrap();
        assert_eq!(detail.kind, FailureKind::StageExecution);
        assert!(detail.message.contains("boom"));

        assert!(StageOutcome::from_result(&Ok(())).is_success());
    }

    #[test]
    fn at_records_creation_time() {
        let before = Utc::now();
        let ok = StageOutcome::success();
        let failed = StageOutcome::failure(FailureKind::Cancelled, "stop");
        let after = Utc::now();

        for o in [&ok, &failed] {
            assert!(o.at() >= before && o.at() <= after);
        }
    }
}
