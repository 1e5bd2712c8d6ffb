//! Request submission and fulfilment flows over the SQLite store.
//!
//! These are the handlers a page or route calls: submit a request under the
//! quota, move a request through its lifecycle, and build a profile's badge
//! overview. Badge awards are emitted here when a fulfilment pushes a count
//! across a threshold.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::badges::{
    current_streak, evaluate_tier, longest_streak, newly_earned, ActivityCounts, BadgeAward,
    BadgeSummary, BadgeTrack,
};
use crate::error::Result;
use crate::quota::{QuotaPolicy, QuotaSnapshot};
use crate::requests::{require_id, RequestRecord, RequestStatus};
use crate::storage::Database;

/// Outcome of a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub request: RequestRecord,
    pub quota: QuotaSnapshot,
}

/// Outcome of a status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub previous: RequestStatus,
    pub request: RequestRecord,
    /// Awards first reached because of this change
    pub awards: Vec<BadgeAward>,
}

/// Badge overview plus the stored award history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileBadges {
    #[serde(flatten)]
    pub summary: BadgeSummary,
    /// Best run of consecutive active days in the profile's history
    pub longest_streak_days: u32,
    pub awards: Vec<BadgeAward>,
}

/// Submit a new pending request, refusing it when the requester's quota is
/// used up.
///
/// # Errors
/// Returns [`crate::CoreError::QuotaExceeded`] when no requests remain.
pub fn submit_request(
    db: &mut Database,
    policy: &QuotaPolicy,
    requester: &str,
    giver: &str,
    now: DateTime<Utc>,
) -> Result<Submission> {
    let (request, quota) = db.insert_request_within_quota(requester, giver, policy, now)?;
    Ok(Submission { request, quota })
}

/// Move a request to `next`. A fulfilment may earn the giver a give-track
/// tier and the requester a receive-track tier; those awards are recorded
/// when `record_awards` is set.
///
/// # Errors
/// Returns validation errors for disallowed transitions and database errors
/// for unknown requests or failed writes.
pub fn transition_request(
    db: &Database,
    id: &str,
    next: RequestStatus,
    now: DateTime<Utc>,
    record_awards: bool,
) -> Result<Transition> {
    let (previous, request) = db.update_status(id, next, now)?;

    let mut awards = Vec::new();
    if request.status == RequestStatus::Fulfilled && record_awards {
        let (given, _) = db.gift_counts(&request.giver)?;
        let (_, received) = db.gift_counts(&request.requester)?;

        for (profile, track, count) in [
            (&request.giver, BadgeTrack::Give, given),
            (&request.requester, BadgeTrack::Receive, received),
        ] {
            for tier in newly_earned(track, (count - 1).max(0), count)? {
                let award = BadgeAward {
                    profile_id: profile.clone(),
                    track,
                    tier,
                    earned_at: now,
                };
                if db.record_award(&award)? {
                    awards.push(award);
                }
            }
        }
    }

    Ok(Transition {
        previous,
        request,
        awards,
    })
}

/// Evaluate every badge track for a profile from stored rows.
///
/// Tiers already earned but missing from the award table are backfilled
/// with `now` as their `earned_at` when `record_awards` is set.
///
/// # Errors
/// Returns an error for an empty id or if a query fails.
pub fn profile_badges(
    db: &Database,
    profile_id: &str,
    today: NaiveDate,
    now: DateTime<Utc>,
    record_awards: bool,
) -> Result<ProfileBadges> {
    require_id(profile_id, "profile_id")?;

    let (gifts_given, gifts_received) = db.gift_counts(profile_id)?;
    let dates = db.activity_dates(profile_id)?;
    let counts = ActivityCounts {
        gifts_given,
        gifts_received,
        streak_days: i64::from(current_streak(&dates, today)),
    };
    let summary = BadgeSummary::evaluate(profile_id, counts)?;

    if record_awards {
        for track in BadgeTrack::ALL {
            let reached = evaluate_tier(track, counts.for_track(track))?;
            for tier in 1..=reached.tier.unwrap_or(0) {
                db.record_award(&BadgeAward {
                    profile_id: profile_id.to_string(),
                    track,
                    tier,
                    earned_at: now,
                })?;
            }
        }
    }

    let awards = db.awards(profile_id)?;
    let longest_streak_days = longest_streak(&dates);
    tracing::debug!(
        profile_id,
        tiers = summary.total_tiers(),
        awards = awards.len(),
        "evaluated profile badges"
    );
    Ok(ProfileBadges {
        summary,
        longest_streak_days,
        awards,
    })
}
