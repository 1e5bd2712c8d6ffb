//! Badge tiers for gifts given, gifts received and participation streaks.
//!
//! Tiers are always recomputed from lifetime counts. [`BadgeAward`] rows are
//! an additional record of when a tier was first reached, so that an
//! `earned_at` date can be shown without replaying history.

mod streak;
mod summary;
mod tier;

pub use streak::{current_streak, longest_streak};
pub use summary::{ActivityCounts, BadgeSummary};
pub use tier::{
    describe_requirement, evaluate_tier, newly_earned, progress, BadgeProgress, BadgeTier,
    BadgeTrack, GIFT_THRESHOLDS, STREAK_THRESHOLD_DAYS,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// First time a profile reached a tier on a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeAward {
    pub profile_id: String,
    pub track: BadgeTrack,
    pub tier: u8,
    pub earned_at: DateTime<Utc>,
}
