//! Request quota commands.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use harmonic_core::{Config, CoreError, Database, QuotaTracker};

use super::{parse_time, print_json};

#[derive(Subcommand)]
pub enum QuotaAction {
    /// Show quota usage for one user
    Show {
        /// Profile ID
        user: String,
        /// Evaluate at this instant instead of now (RFC 3339)
        #[arg(long, value_parser = parse_time)]
        now: Option<DateTime<Utc>>,
    },
    /// Fail with exit code 1 if the user has no requests left
    Enforce {
        /// Profile ID
        user: String,
        /// Evaluate at this instant instead of now (RFC 3339)
        #[arg(long, value_parser = parse_time)]
        now: Option<DateTime<Utc>>,
    },
    /// Show quota usage for several users at once
    Bulk {
        /// Profile IDs
        #[arg(required = true)]
        users: Vec<String>,
        /// Evaluate at this instant instead of now (RFC 3339)
        #[arg(long, value_parser = parse_time)]
        now: Option<DateTime<Utc>>,
    },
}

pub fn run(action: QuotaAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let tracker = QuotaTracker::with_policy(&db, config.quota_policy());

    match action {
        QuotaAction::Show { user, now } => {
            let snapshot = tracker.compute_quota(&user, now)?;
            print_json(&snapshot)?;
        }
        QuotaAction::Enforce { user, now } => match tracker.enforce_quota(&user, now) {
            Ok(snapshot) => print_json(&snapshot)?,
            Err(err @ CoreError::QuotaExceeded { .. }) => {
                if let CoreError::QuotaExceeded { snapshot, .. } = &err {
                    print_json(&serde_json::json!({
                        "error": err.to_string(),
                        "quota": snapshot,
                    }))?;
                }
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        },
        QuotaAction::Bulk { users, now } => {
            let entries = tracker.compute_quota_bulk(&users, now)?;
            print_json(&entries)?;
        }
    }
    Ok(())
}
