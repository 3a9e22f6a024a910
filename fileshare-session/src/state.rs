//! Observable states of the write flows.

use std::fmt;

use serde::{Deserialize, Serialize};

use fileshare_core::error::FileshareError;
use fileshare_core::types::ContentAddress;

/// Why a flow ended in `Failed`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    /// Stable error code, e.g. `NOT_REGISTERED`
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Whether a new attempt may succeed without changing inputs
    pub retryable: bool,
}

impl From<&FileshareError> for FailureReason {
    fn from(err: &FileshareError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Publish attempt state.
///
/// ```text
/// Idle -> Validating -> Storing -> Recording -> Done
///            |             |           |
///            +-------------+-----------+------> Failed
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PublishState {
    /// No attempt running.
    #[default]
    Idle,
    /// Checking inputs and registration.
    Validating,
    /// Writing bytes to the content store.
    Storing,
    /// Recording the entry on the ledger.
    Recording {
        /// Address the bytes were stored under
        address: ContentAddress,
    },
    /// Entry recorded.
    Done {
        /// Address of the published bytes
        address: ContentAddress,
        /// Ledger transaction hash
        tx_hash: String,
    },
    /// Attempt ended without recording an entry.
    Failed {
        /// Cause
        reason: FailureReason,
    },
}

impl PublishState {
    /// True for `Done` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PublishState::Done { .. } | PublishState::Failed { .. })
    }

    /// True while an attempt holds the session's publish slot.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            PublishState::Validating | PublishState::Storing | PublishState::Recording { .. }
        )
    }

    /// Short label for progress display.
    pub fn label(&self) -> &'static str {
        match self {
            PublishState::Idle => "idle",
            PublishState::Validating => "validating",
            PublishState::Storing => "storing",
            PublishState::Recording { .. } => "recording",
            PublishState::Done { .. } => "done",
            PublishState::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishState::Failed { reason } => write!(f, "failed ({})", reason),
            other => f.write_str(other.label()),
        }
    }
}

/// Registration flow state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SignupState {
    /// Not started.
    #[default]
    Idle,
    /// `signup()` submitted, awaiting confirmation.
    Registering,
    /// The identity is registered.
    Registered,
    /// Registration failed.
    Failed {
        /// Cause
        reason: FailureReason,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reason_from_error() {
        let reason = FailureReason::from(&FileshareError::StoreUnavailable("down".into()));
        assert_eq!(reason.code, "STORE_UNAVAILABLE");
        assert!(reason.retryable);

        let reason = FailureReason::from(&FileshareError::NotRegistered("0xabc".into()));
        assert!(!reason.retryable);
    }

    #[test]
    fn test_state_classification() {
        assert!(!PublishState::Idle.is_active());
        assert!(PublishState::Storing.is_active());
        assert!(!PublishState::Storing.is_terminal());

        let failed = PublishState::Failed {
            reason: FailureReason::from(&FileshareError::EmptyName),
        };
        assert!(failed.is_terminal());
        assert!(failed.to_string().starts_with("failed (EMPTY_NAME"));
    }

    #[test]
    fn test_state_serializes_tagged() {
        let json = serde_json::to_value(PublishState::Validating).unwrap();
        assert_eq!(json["state"], "validating");
    }
}
