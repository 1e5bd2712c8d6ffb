//! Exchange requests and their lifecycle.
//!
//! A request is one user asking for another user's offer. Rows move through
//! a small status machine:
//!
//! ```text
//! pending ──> accepted ──> fulfilled
//!    │           │
//!    ├──> declined
//!    └───────────┴──> cancelled
//! ```
//!
//! Only `pending`, `accepted` and `fulfilled` rows count toward the request
//! quota.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Status of an exchange request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Waiting for the giver to respond
    Pending,
    /// Giver agreed; hand-off not yet confirmed
    Accepted,
    /// Gift changed hands
    Fulfilled,
    /// Giver turned the request down
    Declined,
    /// Withdrawn before fulfilment
    Cancelled,
}

/// Statuses that consume request quota.
pub const QUALIFYING_STATUSES: [RequestStatus; 3] = [
    RequestStatus::Pending,
    RequestStatus::Accepted,
    RequestStatus::Fulfilled,
];

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Fulfilled => "fulfilled",
            RequestStatus::Declined => "declined",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    /// Whether a row in this status counts toward the request quota.
    pub fn is_qualifying(&self) -> bool {
        QUALIFYING_STATUSES.contains(self)
    }

    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Fulfilled | RequestStatus::Declined | RequestStatus::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted)
                | (Pending, Declined)
                | (Pending, Cancelled)
                | (Accepted, Fulfilled)
                | (Accepted, Cancelled)
        )
    }

    /// Validate a transition, returning the new status on success.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidTransition`] if the lifecycle does
    /// not allow moving from `self` to `next`.
    pub fn transition(self, next: RequestStatus) -> Result<RequestStatus, ValidationError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ValidationError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "accepted" => Ok(RequestStatus::Accepted),
            "fulfilled" => Ok(RequestStatus::Fulfilled),
            "declined" => Ok(RequestStatus::Declined),
            "cancelled" | "canceled" => Ok(RequestStatus::Cancelled),
            _ => Err(ValidationError::UnknownStatus(s.to_string())),
        }
    }
}

/// One stored exchange request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: String,
    /// Profile asking for the gift
    pub requester: String,
    /// Profile that owns the offer
    pub giver: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RequestRecord {
    /// Build a fresh pending request with a random id.
    pub fn new_pending(requester: &str, giver: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            requester: requester.to_string(),
            giver: giver.to_string(),
            status: RequestStatus::Pending,
            created_at,
            updated_at: created_at,
        }
    }
}

/// Reject empty identifiers before they reach a query.
pub(crate) fn require_id(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyIdentifier { field })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifying_set_matches_quota_rules() {
        assert!(RequestStatus::Pending.is_qualifying());
        assert!(RequestStatus::Accepted.is_qualifying());
        assert!(RequestStatus::Fulfilled.is_qualifying());
        assert!(!RequestStatus::Declined.is_qualifying());
        assert!(!RequestStatus::Cancelled.is_qualifying());
    }

    #[test]
    fn happy_path_transitions() {
        let s = RequestStatus::Pending
            .transition(RequestStatus::Accepted)
            .unwrap();
        let s = s.transition(RequestStatus::Fulfilled).unwrap();
        assert!(s.is_terminal());
    }

    #[test]
    fn rejects_skipping_acceptance() {
        let err = RequestStatus::Pending
            .transition(RequestStatus::Fulfilled)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidTransition {
                from: "pending".to_string(),
                to: "fulfilled".to_string(),
            }
        );
    }

    #[test]
    fn terminal_states_are_final() {
        for terminal in [
            RequestStatus::Fulfilled,
            RequestStatus::Declined,
            RequestStatus::Cancelled,
        ] {
            for next in [
                RequestStatus::Pending,
                RequestStatus::Accepted,
                RequestStatus::Fulfilled,
                RequestStatus::Declined,
                RequestStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn parses_status_strings() {
        assert_eq!("Pending".parse::<RequestStatus>().unwrap(), RequestStatus::Pending);
        assert_eq!(" fulfilled ".parse::<RequestStatus>().unwrap(), RequestStatus::Fulfilled);
        assert_eq!("canceled".parse::<RequestStatus>().unwrap(), RequestStatus::Cancelled);
        assert!("shipped".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&RequestStatus::Fulfilled).unwrap();
        assert_eq!(json, "\"fulfilled\"");
    }

    #[test]
    fn require_id_rejects_blank() {
        assert!(require_id("  ", "user_id").is_err());
        assert!(require_id("u1", "user_id").is_ok());
    }
}
