//! Badge commands.

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use harmonic_core::badges::progress;
use harmonic_core::exchange::profile_badges;
use harmonic_core::{describe_requirement, BadgeTrack, Config, Database};

use super::{parse_date, print_json};

#[derive(Subcommand)]
pub enum BadgeAction {
    /// Evaluate a tier from a count
    Evaluate {
        /// Track: give, receive or streak
        track: BadgeTrack,
        /// Lifetime count (or streak length in days)
        #[arg(allow_negative_numbers = true)]
        count: i64,
    },
    /// Describe what a tier requires
    Describe {
        /// Track: give, receive or streak
        track: BadgeTrack,
        /// Tier index (1-based)
        #[arg(allow_negative_numbers = true)]
        tier: i64,
    },
    /// Evaluate all tracks for a profile from stored requests
    Profile {
        /// Profile ID
        user: String,
        /// Treat this date as today (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        today: Option<NaiveDate>,
    },
    /// List awards a profile has earned
    Awards {
        /// Profile ID
        user: String,
    },
}

pub fn run(action: BadgeAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        BadgeAction::Evaluate { track, count } => {
            print_json(&progress(track, count)?)?;
        }
        BadgeAction::Describe { track, tier } => {
            let requirement = describe_requirement(track, tier)?;
            print_json(&serde_json::json!({
                "track": track,
                "tier": tier,
                "requirement": requirement,
            }))?;
        }
        BadgeAction::Profile { user, today } => {
            let config = Config::load()?;
            let db = Database::open()?;
            let now = Utc::now();
            let today = today.unwrap_or_else(|| now.date_naive());
            let badges = profile_badges(&db, &user, today, now, config.badges.record_awards)?;
            print_json(&badges)?;
        }
        BadgeAction::Awards { user } => {
            let db = Database::open()?;
            print_json(&db.awards(&user)?)?;
        }
    }
    Ok(())
}
