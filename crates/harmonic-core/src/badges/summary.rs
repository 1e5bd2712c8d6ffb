//! Per-profile badge overview.

use serde::{Deserialize, Serialize};

use super::tier::{progress, BadgeProgress, BadgeTrack};
use crate::error::ValidationError;

/// Lifetime inputs for the three tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCounts {
    /// Fulfilled requests where the profile was the giver
    pub gifts_given: i64,
    /// Fulfilled requests where the profile was the requester
    pub gifts_received: i64,
    /// Current run of consecutive active days
    pub streak_days: i64,
}

impl ActivityCounts {
    pub fn for_track(&self, track: BadgeTrack) -> i64 {
        match track {
            BadgeTrack::Give => self.gifts_given,
            BadgeTrack::Receive => self.gifts_received,
            BadgeTrack::Streak => self.streak_days,
        }
    }
}

/// Badge state of one profile across all tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeSummary {
    pub profile_id: String,
    pub counts: ActivityCounts,
    pub give: BadgeProgress,
    pub receive: BadgeProgress,
    pub streak: BadgeProgress,
}

impl BadgeSummary {
    /// Evaluate every track from `counts`.
    ///
    /// # Errors
    /// Returns [`ValidationError::NegativeCount`] if any count is negative.
    pub fn evaluate(profile_id: &str, counts: ActivityCounts) -> Result<Self, ValidationError> {
        Ok(Self {
            profile_id: profile_id.to_string(),
            counts,
            give: progress(BadgeTrack::Give, counts.gifts_given)?,
            receive: progress(BadgeTrack::Receive, counts.gifts_received)?,
            streak: progress(BadgeTrack::Streak, counts.streak_days)?,
        })
    }

    pub fn tracks(&self) -> [&BadgeProgress; 3] {
        [&self.give, &self.receive, &self.streak]
    }

    /// Number of tiers earned across all tracks.
    pub fn total_tiers(&self) -> u32 {
        self.tracks()
            .iter()
            .filter_map(|p| p.current.tier)
            .map(u32::from)
            .sum()
    }
}
