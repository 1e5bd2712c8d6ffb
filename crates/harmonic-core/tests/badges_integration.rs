//! Integration tests for badge evaluation and award history.

use chrono::{DateTime, Duration, Utc};
use harmonic_core::badges::{newly_earned, progress, GIFT_THRESHOLDS};
use harmonic_core::exchange::{profile_badges, submit_request, transition_request};
use harmonic_core::{
    describe_requirement, evaluate_tier, BadgeTrack, Database, QuotaPolicy, RequestStatus,
    ValidationError,
};
use proptest::prelude::*;

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-08-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

#[test]
fn test_documented_tier_examples() {
    let give = |n| evaluate_tier(BadgeTrack::Give, n).unwrap();
    assert_eq!((give(0).tier, give(0).earned), (None, false));
    assert_eq!((give(1).tier, give(1).earned), (Some(1), true));
    assert_eq!((give(5).tier, give(5).earned), (Some(2), true));
    assert_eq!((give(100).tier, give(100).earned), (Some(6), true));
    assert_eq!((give(1000).tier, give(1000).earned), (Some(6), true));

    assert!(!evaluate_tier(BadgeTrack::Streak, 6).unwrap().earned);
    assert!(evaluate_tier(BadgeTrack::Streak, 7).unwrap().earned);
}

#[test]
fn test_every_tier_has_a_requirement() {
    for track in [BadgeTrack::Give, BadgeTrack::Receive] {
        for tier in 1..=6 {
            let text = describe_requirement(track, tier).unwrap();
            let threshold = GIFT_THRESHOLDS[(tier - 1) as usize];
            assert!(text.contains(&threshold.to_string()), "{text}");
        }
        assert!(matches!(
            describe_requirement(track, 7),
            Err(ValidationError::TierOutOfRange { .. })
        ));
    }
}

#[test]
fn test_twenty_gifts_walk_through_tiers() {
    let mut db = Database::open_memory().unwrap();
    // Enough room for twenty requests from one requester
    let policy = QuotaPolicy { window_days: 30, limit: 50 };
    let mut give_awards = Vec::new();

    for i in 0..20 {
        let at = now() + Duration::minutes(i);
        let sub = submit_request(&mut db, &policy, "sol", "ren", at).unwrap();
        transition_request(&db, &sub.request.id, RequestStatus::Accepted, at, true).unwrap();
        let done =
            transition_request(&db, &sub.request.id, RequestStatus::Fulfilled, at, true).unwrap();
        give_awards.extend(
            done.awards
                .into_iter()
                .filter(|a| a.track == BadgeTrack::Give)
                .map(|a| a.tier),
        );
    }

    assert_eq!(give_awards, vec![1, 2, 3, 4]);
    let badges = profile_badges(&db, "ren", now().date_naive(), now(), true).unwrap();
    assert_eq!(badges.summary.give.current.tier, Some(4));
    assert_eq!(badges.summary.give.next_threshold, Some(40));
    assert_eq!(badges.summary.receive.current.tier, None);

    let sol = profile_badges(&db, "sol", now().date_naive(), now(), true).unwrap();
    assert_eq!(sol.summary.receive.current.tier, Some(4));
}

#[test]
fn test_week_of_activity_earns_streak() {
    let db = Database::open_memory().unwrap();
    let t = now();
    for day in 0..7 {
        db.insert_request("ada", &format!("friend{day}"), RequestStatus::Pending, t - Duration::days(day))
            .unwrap();
    }

    let badges = profile_badges(&db, "ada", t.date_naive(), t, true).unwrap();
    assert_eq!(badges.summary.counts.streak_days, 7);
    assert!(badges.summary.streak.current.earned);
    assert!(badges
        .awards
        .iter()
        .any(|a| a.track == BadgeTrack::Streak && a.tier == 1));
}

#[test]
fn test_award_keeps_first_earned_at() {
    let db = Database::open_memory().unwrap();
    db.insert_request("ada", "ren", RequestStatus::Fulfilled, now()).unwrap();

    let first = profile_badges(&db, "ren", now().date_naive(), now(), true).unwrap();
    let later = now() + Duration::days(30);
    let second = profile_badges(&db, "ren", later.date_naive(), later, true).unwrap();

    assert_eq!(first.awards, second.awards);
    assert_eq!(second.awards[0].earned_at, now());
}

proptest! {
    #[test]
    fn prop_tier_is_monotonic(a in 0i64..500, b in 0i64..500) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let lo_tier = evaluate_tier(BadgeTrack::Give, lo).unwrap().tier.unwrap_or(0);
        let hi_tier = evaluate_tier(BadgeTrack::Give, hi).unwrap().tier.unwrap_or(0);
        prop_assert!(lo_tier <= hi_tier);
    }

    #[test]
    fn prop_newly_earned_agrees_with_evaluation(prev in 0i64..150, delta in 0i64..150) {
        let curr = prev + delta;
        let before = evaluate_tier(BadgeTrack::Receive, prev).unwrap().tier.unwrap_or(0);
        let after = evaluate_tier(BadgeTrack::Receive, curr).unwrap().tier.unwrap_or(0);
        let crossed = newly_earned(BadgeTrack::Receive, prev, curr).unwrap();
        let expected: Vec<u8> = ((before + 1)..=after).collect();
        prop_assert_eq!(crossed, expected);
    }

    #[test]
    fn prop_progress_remaining_is_positive(count in 0i64..99) {
        let p = progress(BadgeTrack::Give, count).unwrap();
        prop_assert!(p.remaining_to_next.unwrap() > 0);
    }
}
