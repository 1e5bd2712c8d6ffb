//! Rolling request quota.
//!
//! Answers "how many qualifying requests has this user made in the trailing
//! window, and how many more may they make?". Counts come from a
//! [`RequestLog`]; the tracker itself is read-only and keeps no state between
//! calls.
//!
//! Enforcement through [`QuotaTracker::enforce_quota`] is a plain
//! check-then-act: two submissions racing for the same user can both pass.
//! [`crate::storage::Database::insert_request_within_quota`] performs the
//! check and the insert in one transaction for the SQLite store.

mod policy;

pub use policy::{
    is_valid_window, parse_limit, parse_limit_or, QuotaPolicy, DEFAULT_REQUEST_LIMIT,
    DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS, QUOTA_LIMIT_ENV,
};

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, LookupError, Result};
use crate::requests::{require_id, RequestRecord, RequestStatus, QUALIFYING_STATUSES};

/// Read access to stored exchange requests.
pub trait RequestLog {
    /// Count rows for `requester` whose status is in `statuses` and whose
    /// `created_at >= cutoff`.
    fn count_requests_since(
        &self,
        requester: &str,
        statuses: &[RequestStatus],
        cutoff: DateTime<Utc>,
    ) -> Result<u64, LookupError>;

    /// Same predicate as [`RequestLog::count_requests_since`], grouped by
    /// requester for every id in `requesters`. Ids without rows may be
    /// missing from the map.
    fn count_requests_by_requester(
        &self,
        requesters: &[String],
        statuses: &[RequestStatus],
        cutoff: DateTime<Utc>,
    ) -> Result<HashMap<String, u64>, LookupError>;
}

impl<T: RequestLog + ?Sized> RequestLog for &T {
    fn count_requests_since(
        &self,
        requester: &str,
        statuses: &[RequestStatus],
        cutoff: DateTime<Utc>,
    ) -> Result<u64, LookupError> {
        (**self).count_requests_since(requester, statuses, cutoff)
    }

    fn count_requests_by_requester(
        &self,
        requesters: &[String],
        statuses: &[RequestStatus],
        cutoff: DateTime<Utc>,
    ) -> Result<HashMap<String, u64>, LookupError> {
        (**self).count_requests_by_requester(requesters, statuses, cutoff)
    }
}

/// In-memory rows, mostly useful in tests and for pre-fetched data.
impl RequestLog for [RequestRecord] {
    fn count_requests_since(
        &self,
        requester: &str,
        statuses: &[RequestStatus],
        cutoff: DateTime<Utc>,
    ) -> Result<u64, LookupError> {
        Ok(self
            .iter()
            .filter(|r| r.requester == requester)
            .filter(|r| statuses.contains(&r.status) && r.created_at >= cutoff)
            .count() as u64)
    }

    fn count_requests_by_requester(
        &self,
        requesters: &[String],
        statuses: &[RequestStatus],
        cutoff: DateTime<Utc>,
    ) -> Result<HashMap<String, u64>, LookupError> {
        let wanted: HashSet<&str> = requesters.iter().map(String::as_str).collect();
        let mut counts: HashMap<String, u64> = HashMap::new();
        for record in self {
            if wanted.contains(record.requester.as_str())
                && statuses.contains(&record.status)
                && record.created_at >= cutoff
            {
                *counts.entry(record.requester.clone()).or_default() += 1;
            }
        }
        Ok(counts)
    }
}

impl RequestLog for Vec<RequestRecord> {
    fn count_requests_since(
        &self,
        requester: &str,
        statuses: &[RequestStatus],
        cutoff: DateTime<Utc>,
    ) -> Result<u64, LookupError> {
        self.as_slice().count_requests_since(requester, statuses, cutoff)
    }

    fn count_requests_by_requester(
        &self,
        requesters: &[String],
        statuses: &[RequestStatus],
        cutoff: DateTime<Utc>,
    ) -> Result<HashMap<String, u64>, LookupError> {
        self.as_slice()
            .count_requests_by_requester(requesters, statuses, cutoff)
    }
}

/// Quota usage for one user at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    pub used: u32,
    pub limit: u32,
    /// `max(limit - used, 0)`
    pub remaining: u32,
    /// Window label, `last_30_days` by default
    pub window: String,
}

impl QuotaSnapshot {
    pub fn new(used: u32, policy: &QuotaPolicy) -> Self {
        Self {
            used,
            limit: policy.limit,
            remaining: policy.limit.saturating_sub(used),
            window: policy.window_label(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Per-user entry of a bulk quota review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkQuotaEntry {
    pub profile_id: String,
    pub used: u32,
    pub limit: u32,
}

/// Computes request quotas against a [`RequestLog`].
pub struct QuotaTracker<L> {
    log: L,
    policy: QuotaPolicy,
}

impl<L: RequestLog> QuotaTracker<L> {
    /// Create a tracker with the default policy (30 days, limit 3).
    pub fn new(log: L) -> Self {
        Self::with_policy(log, QuotaPolicy::default())
    }

    /// Create a tracker with an explicit policy.
    pub fn with_policy(log: L, policy: QuotaPolicy) -> Self {
        Self { log, policy }
    }

    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    /// Compute quota usage for `user_id` at `now` (wall clock if `None`).
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidArgument`] for an empty id or an unusable
    /// window and [`CoreError::Lookup`] if the count query fails.
    pub fn compute_quota(&self, user_id: &str, now: Option<DateTime<Utc>>) -> Result<QuotaSnapshot> {
        require_id(user_id, "user_id")?;
        let now = now.unwrap_or_else(Utc::now);
        let cutoff = self.policy.cutoff(now)?;

        let count = self
            .log
            .count_requests_since(user_id, &QUALIFYING_STATUSES, cutoff)?;
        let snapshot = QuotaSnapshot::new(saturate(count), &self.policy);

        tracing::debug!(
            user_id,
            used = snapshot.used,
            limit = snapshot.limit,
            remaining = snapshot.remaining,
            "computed request quota"
        );
        Ok(snapshot)
    }

    /// Compute quota usage and fail if nothing remains.
    ///
    /// Must succeed immediately before a new request is recorded.
    ///
    /// # Errors
    /// Returns [`CoreError::QuotaExceeded`] when `remaining` is zero, plus
    /// everything [`QuotaTracker::compute_quota`] can return.
    pub fn enforce_quota(&self, user_id: &str, now: Option<DateTime<Utc>>) -> Result<QuotaSnapshot> {
        let snapshot = self.compute_quota(user_id, now)?;
        check_remaining(snapshot, &self.policy)
    }

    /// Compute usage for many users in one pass.
    ///
    /// Returns one entry per distinct id, in first-seen order, with `used = 0`
    /// for ids that have no qualifying rows. Authorization of the caller is
    /// the caller's concern.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidArgument`] if any id is empty and
    /// [`CoreError::Lookup`] if the grouped count fails.
    pub fn compute_quota_bulk(
        &self,
        user_ids: &[String],
        now: Option<DateTime<Utc>>,
    ) -> Result<Vec<BulkQuotaEntry>> {
        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(user_ids.len());
        for id in user_ids {
            require_id(id, "user_id")?;
            if seen.insert(id.as_str()) {
                ids.push(id.clone());
            }
        }
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let now = now.unwrap_or_else(Utc::now);
        let cutoff = self.policy.cutoff(now)?;
        let counts = self
            .log
            .count_requests_by_requester(&ids, &QUALIFYING_STATUSES, cutoff)?;

        let entries: Vec<BulkQuotaEntry> = ids
            .into_iter()
            .map(|id| {
                let used = saturate(counts.get(&id).copied().unwrap_or(0));
                BulkQuotaEntry {
                    profile_id: id,
                    used,
                    limit: self.policy.limit,
                }
            })
            .collect();

        tracing::debug!(profiles = entries.len(), "computed bulk request quota");
        Ok(entries)
    }
}

/// Turn an exhausted snapshot into [`CoreError::QuotaExceeded`].
pub(crate) fn check_remaining(snapshot: QuotaSnapshot, policy: &QuotaPolicy) -> Result<QuotaSnapshot> {
    if snapshot.is_exhausted() {
        tracing::warn!(
            used = snapshot.used,
            limit = snapshot.limit,
            "request quota exhausted"
        );
        return Err(CoreError::QuotaExceeded {
            used: snapshot.used,
            limit: snapshot.limit,
            window_days: policy.window_days,
            snapshot,
        });
    }
    Ok(snapshot)
}

pub(crate) fn saturate(count: u64) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-05-20T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn record(requester: &str, status: RequestStatus, created_at: DateTime<Utc>) -> RequestRecord {
        RequestRecord {
            status,
            ..RequestRecord::new_pending(requester, "giver", created_at)
        }
    }

    struct FailingLog;

    impl RequestLog for FailingLog {
        fn count_requests_since(
            &self,
            _requester: &str,
            _statuses: &[RequestStatus],
            _cutoff: DateTime<Utc>,
        ) -> Result<u64, LookupError> {
            Err(LookupError::QueryFailed("connection reset".to_string()))
        }

        fn count_requests_by_requester(
            &self,
            _requesters: &[String],
            _statuses: &[RequestStatus],
            _cutoff: DateTime<Utc>,
        ) -> Result<HashMap<String, u64>, LookupError> {
            Err(LookupError::Locked)
        }
    }

    #[test]
    fn empty_log_has_full_allowance() {
        let tracker = QuotaTracker::new(Vec::<RequestRecord>::new());
        let snap = tracker.compute_quota("u1", Some(now())).unwrap();
        assert_eq!(
            snap,
            QuotaSnapshot {
                used: 0,
                limit: 3,
                remaining: 3,
                window: "last_30_days".to_string(),
            }
        );
    }

    #[test]
    fn two_fulfilled_and_one_pending_exhaust_default_limit() {
        let t = now();
        let rows = vec![
            record("u1", RequestStatus::Fulfilled, t - Duration::days(3)),
            record("u1", RequestStatus::Fulfilled, t - Duration::days(10)),
            record("u1", RequestStatus::Pending, t - Duration::hours(2)),
        ];
        let tracker = QuotaTracker::new(rows);

        let snap = tracker.compute_quota("u1", Some(t)).unwrap();
        assert_eq!((snap.used, snap.limit, snap.remaining), (3, 3, 0));

        let err = tracker.enforce_quota("u1", Some(t)).unwrap_err();
        match err {
            CoreError::QuotaExceeded { used, limit, snapshot, .. } => {
                assert_eq!((used, limit), (3, 3));
                assert_eq!(snapshot.remaining, 0);
            }
            other => panic!("expected QuotaExceeded, got {other:?}"),
        }
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let t = now();
        let on_boundary = vec![record("u1", RequestStatus::Pending, t - Duration::days(30))];
        let tracker = QuotaTracker::new(on_boundary);
        assert_eq!(tracker.compute_quota("u1", Some(t)).unwrap().used, 1);

        let just_outside = vec![record(
            "u1",
            RequestStatus::Pending,
            t - Duration::days(30) - Duration::seconds(1),
        )];
        let tracker = QuotaTracker::new(just_outside);
        assert_eq!(tracker.compute_quota("u1", Some(t)).unwrap().used, 0);
    }

    #[test]
    fn non_qualifying_statuses_and_other_users_are_ignored() {
        let t = now();
        let rows = vec![
            record("u1", RequestStatus::Declined, t),
            record("u1", RequestStatus::Cancelled, t),
            record("u2", RequestStatus::Pending, t),
            record("u1", RequestStatus::Accepted, t),
        ];
        let tracker = QuotaTracker::new(rows);
        let snap = tracker.compute_quota("u1", Some(t)).unwrap();
        assert_eq!(snap.used, 1);
        assert_eq!(snap.remaining, 2);
    }

    #[test]
    fn remaining_never_goes_negative() {
        let t = now();
        let rows: Vec<_> = (0..5)
            .map(|i| record("u1", RequestStatus::Pending, t - Duration::hours(i)))
            .collect();
        let tracker = QuotaTracker::new(rows);
        let snap = tracker.compute_quota("u1", Some(t)).unwrap();
        assert_eq!(snap.used, 5);
        assert_eq!(snap.remaining, 0);
    }

    #[test]
    fn custom_policy_changes_limit_and_label() {
        let policy = QuotaPolicy { window_days: 7, limit: 10 };
        let tracker = QuotaTracker::with_policy(Vec::<RequestRecord>::new(), policy);
        let snap = tracker.enforce_quota("u1", Some(now())).unwrap();
        assert_eq!(snap.limit, 10);
        assert_eq!(snap.window, "last_7_days");
    }

    #[test]
    fn unusable_window_is_an_error_not_a_panic() {
        for window_days in [0, 4_000_000_000] {
            let policy = QuotaPolicy { window_days, limit: 3 };
            let tracker = QuotaTracker::with_policy(Vec::<RequestRecord>::new(), policy);
            let ids = vec!["u1".to_string()];
            for err in [
                tracker.compute_quota("u1", Some(now())).unwrap_err(),
                tracker.enforce_quota("u1", Some(now())).unwrap_err(),
                tracker.compute_quota_bulk(&ids, Some(now())).unwrap_err(),
            ] {
                assert!(matches!(
                    err,
                    CoreError::InvalidArgument(ValidationError::WindowOutOfRange { .. })
                ));
            }
        }
    }

    #[test]
    fn empty_user_id_is_invalid() {
        let tracker = QuotaTracker::new(Vec::<RequestRecord>::new());
        let err = tracker.compute_quota("", Some(now())).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
    }

    #[test]
    fn lookup_failure_propagates() {
        let tracker = QuotaTracker::new(FailingLog);
        let err = tracker.enforce_quota("u1", Some(now())).unwrap_err();
        assert!(matches!(err, CoreError::Lookup(LookupError::QueryFailed(_))));

        let err = tracker
            .compute_quota_bulk(&["u1".to_string()], Some(now()))
            .unwrap_err();
        assert!(matches!(err, CoreError::Lookup(LookupError::Locked)));
    }

    #[test]
    fn bulk_returns_one_entry_per_id() {
        let t = now();
        let rows = vec![
            record("u1", RequestStatus::Pending, t),
            record("u1", RequestStatus::Fulfilled, t - Duration::days(1)),
            record("u3", RequestStatus::Accepted, t),
        ];
        let tracker = QuotaTracker::new(rows);
        let ids = vec!["u1".to_string(), "u2".to_string(), "u1".to_string()];
        let entries = tracker.compute_quota_bulk(&ids, Some(t)).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], BulkQuotaEntry { profile_id: "u1".into(), used: 2, limit: 3 });
        assert_eq!(entries[1], BulkQuotaEntry { profile_id: "u2".into(), used: 0, limit: 3 });
    }

    #[test]
    fn bulk_values_do_not_depend_on_order() {
        let t = now();
        let rows = vec![
            record("u1", RequestStatus::Pending, t),
            record("u2", RequestStatus::Pending, t),
            record("u2", RequestStatus::Accepted, t),
        ];
        let tracker = QuotaTracker::new(rows);
        let forward = tracker
            .compute_quota_bulk(&["u1".to_string(), "u2".to_string()], Some(t))
            .unwrap();
        let mut backward = tracker
            .compute_quota_bulk(&["u2".to_string(), "u1".to_string()], Some(t))
            .unwrap();
        backward.sort_by(|a, b| a.profile_id.cmp(&b.profile_id));
        assert_eq!(forward, backward);
    }

    #[test]
    fn bulk_with_no_ids_is_empty() {
        let tracker = QuotaTracker::new(Vec::<RequestRecord>::new());
        assert!(tracker.compute_quota_bulk(&[], Some(now())).unwrap().is_empty());
    }
}
