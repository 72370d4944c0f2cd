//! Processing state normalizer.
//!
//! Raw status tokens coming out of the workflow store are classified into
//! the closed [`ProcessingState`] enumeration. An absent status is
//! `no_status`; any token outside the enumeration is rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// Closed set of states a DAG run or task instance can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Skipped,
    Success,
    NoStatus,
    Queued,
    Running,
    UpForRetry,
    UpForReschedule,
    UpstreamFailed,
    Scheduled,
    Failed,
}

impl ProcessingState {
    /// Every member, fallback included.
    pub const ALL: [ProcessingState; 10] = [
        ProcessingState::Skipped,
        ProcessingState::Success,
        ProcessingState::NoStatus,
        ProcessingState::Queued,
        ProcessingState::Running,
        ProcessingState::UpForRetry,
        ProcessingState::UpForReschedule,
        ProcessingState::UpstreamFailed,
        ProcessingState::Scheduled,
        ProcessingState::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingState::Skipped => "skipped",
            ProcessingState::Success => "success",
            ProcessingState::NoStatus => "no_status",
            ProcessingState::Queued => "queued",
            ProcessingState::Running => "running",
            ProcessingState::UpForRetry => "up_for_retry",
            ProcessingState::UpForReschedule => "up_for_reschedule",
            ProcessingState::UpstreamFailed => "upstream_failed",
            ProcessingState::Scheduled => "scheduled",
            ProcessingState::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingState {
    type Err = StateError;

    /// Parses one of the nine non-fallback tokens. `no_status` is not a
    /// raw token: it only stands in for an absent value.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "skipped" => Ok(ProcessingState::Skipped),
            "success" => Ok(ProcessingState::Success),
            "queued" => Ok(ProcessingState::Queued),
            "running" => Ok(ProcessingState::Running),
            "up_for_retry" => Ok(ProcessingState::UpForRetry),
            "up_for_reschedule" => Ok(ProcessingState::UpForReschedule),
            "upstream_failed" => Ok(ProcessingState::UpstreamFailed),
            "scheduled" => Ok(ProcessingState::Scheduled),
            "failed" => Ok(ProcessingState::Failed),
            other => Err(StateError::UnrecognizedState(other.to_string())),
        }
    }
}

/// Classify a raw status value.
pub fn to_processing_state(raw: Option<&str>) -> Result<ProcessingState, StateError> {
    match raw {
        None => Ok(ProcessingState::NoStatus),
        Some(token) => token.parse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_is_no_status() {
        assert_eq!(to_processing_state(None).unwrap(), ProcessingState::NoStatus);
    }

    #[test]
    fn known_tokens_round_trip() {
        for state in ProcessingState::ALL {
            if state == ProcessingState::NoStatus {
                continue;
            }
            assert_eq!(to_processing_state(Some(state.as_str())).unwrap(), state);
        }
    }

    #[test]
    fn failed_token() {
        assert_eq!(
            to_processing_state(Some("failed")).unwrap(),
            ProcessingState::Failed
        );
    }

    #[test]
    fn bogus_token_is_rejected() {
        let err = to_processing_state(Some("bogus")).unwrap_err();
        assert!(matches!(err, StateError::UnrecognizedState(ref s) if s == "bogus"));
    }

    #[test]
    fn no_status_token_is_not_a_raw_value() {
        assert!(to_processing_state(Some("no_status")).is_err());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&ProcessingState::UpForRetry).unwrap();
        assert_eq!(json, "\"up_for_retry\"");
    }
}
