//! Threshold tables and tier evaluation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lifetime-count thresholds for the give and receive tracks. Tier `k`
/// (1-based) is reached once the count is at least `GIFT_THRESHOLDS[k - 1]`.
pub const GIFT_THRESHOLDS: [i64; 6] = [1, 5, 10, 20, 40, 100];

/// Consecutive days needed for the streak badge.
pub const STREAK_THRESHOLD_DAYS: i64 = 7;

/// Badge family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTrack {
    /// Gifts given to others
    Give,
    /// Gifts received from others
    Receive,
    /// Consecutive days of participation
    Streak,
}

impl BadgeTrack {
    pub const ALL: [BadgeTrack; 3] = [BadgeTrack::Give, BadgeTrack::Receive, BadgeTrack::Streak];

    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeTrack::Give => "give",
            BadgeTrack::Receive => "receive",
            BadgeTrack::Streak => "streak",
        }
    }

    /// Thresholds for this track, lowest tier first.
    pub fn thresholds(&self) -> &'static [i64] {
        match self {
            BadgeTrack::Give | BadgeTrack::Receive => &GIFT_THRESHOLDS,
            BadgeTrack::Streak => &[STREAK_THRESHOLD_DAYS],
        }
    }

    pub fn max_tier(&self) -> u8 {
        self.thresholds().len() as u8
    }

    /// Count required to reach `tier`.
    ///
    /// # Errors
    /// Returns [`ValidationError::TierOutOfRange`] outside `1..=max_tier()`.
    pub fn threshold(&self, tier: i64) -> Result<i64, ValidationError> {
        let max = self.max_tier();
        if tier < 1 || tier > i64::from(max) {
            return Err(ValidationError::TierOutOfRange {
                track: self.as_str().to_string(),
                tier,
                max,
            });
        }
        Ok(self.thresholds()[(tier - 1) as usize])
    }
}

impl fmt::Display for BadgeTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BadgeTrack {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "give" => Ok(BadgeTrack::Give),
            "receive" => Ok(BadgeTrack::Receive),
            "streak" => Ok(BadgeTrack::Streak),
            _ => Err(ValidationError::UnknownTrack(s.to_string())),
        }
    }
}

/// Result of evaluating one track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeTier {
    pub track: BadgeTrack,
    /// Highest tier reached; `None` while unearned
    pub tier: Option<u8>,
    pub earned: bool,
}

/// Where a count sits between the current and the next tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeProgress {
    #[serde(flatten)]
    pub current: BadgeTier,
    pub count: i64,
    /// `None` once the top tier is reached
    pub next_tier: Option<u8>,
    pub next_threshold: Option<i64>,
    pub remaining_to_next: Option<i64>,
    pub next_requirement: Option<String>,
}

fn check_count(count: i64) -> Result<(), ValidationError> {
    if count < 0 {
        Err(ValidationError::NegativeCount(count))
    } else {
        Ok(())
    }
}

fn highest_tier(track: BadgeTrack, count: i64) -> Option<u8> {
    track
        .thresholds()
        .iter()
        .rposition(|&threshold| count >= threshold)
        .map(|idx| idx as u8 + 1)
}

/// Map a lifetime count (or streak length) to a tier.
///
/// Thresholds are inclusive. Counts past the top threshold stay at the top
/// tier. The streak track has a single tier.
///
/// # Errors
/// Returns [`ValidationError::NegativeCount`] for negative counts.
pub fn evaluate_tier(track: BadgeTrack, count: i64) -> Result<BadgeTier, ValidationError> {
    check_count(count)?;
    let tier = highest_tier(track, count);
    Ok(BadgeTier {
        track,
        tier,
        earned: tier.is_some(),
    })
}

/// Human-readable requirement for `tier` of `track`, e.g. "Give 10 gifts".
///
/// # Errors
/// Returns [`ValidationError::TierOutOfRange`] for tiers outside the table.
pub fn describe_requirement(track: BadgeTrack, tier: i64) -> Result<String, ValidationError> {
    let threshold = track.threshold(tier)?;
    let noun = if threshold == 1 { "gift" } else { "gifts" };
    Ok(match track {
        BadgeTrack::Give => format!("Give {threshold} {noun}"),
        BadgeTrack::Receive => format!("Receive {threshold} {noun}"),
        BadgeTrack::Streak => format!("Participate {threshold} days in a row"),
    })
}

/// Current tier plus distance to the next one.
///
/// # Errors
/// Returns [`ValidationError::NegativeCount`] for negative counts.
pub fn progress(track: BadgeTrack, count: i64) -> Result<BadgeProgress, ValidationError> {
    let current = evaluate_tier(track, count)?;
    let next_tier = match current.tier {
        Some(t) if t >= track.max_tier() => None,
        Some(t) => Some(t + 1),
        None => Some(1),
    };

    let (next_threshold, remaining_to_next, next_requirement) = match next_tier {
        Some(t) => {
            let threshold = track.threshold(i64::from(t))?;
            (
                Some(threshold),
                Some(threshold - count),
                Some(describe_requirement(track, i64::from(t))?),
            )
        }
        None => (None, None, None),
    };

    Ok(BadgeProgress {
        current,
        count,
        next_tier,
        next_threshold,
        remaining_to_next,
        next_requirement,
    })
}

/// Tiers crossed when a count moves from `previous` to `current`, ascending.
///
/// Empty when the count did not grow or no threshold lies in between.
///
/// # Errors
/// Returns [`ValidationError::NegativeCount`] if either count is negative.
pub fn newly_earned(track: BadgeTrack, previous: i64, current: i64) -> Result<Vec<u8>, ValidationError> {
    check_count(previous)?;
    check_count(current)?;
    Ok(track
        .thresholds()
        .iter()
        .enumerate()
        .filter(|&(_, &threshold)| previous < threshold && threshold <= current)
        .map(|(idx, _)| idx as u8 + 1)
        .collect())
}
