//! Exchange request commands.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use harmonic_core::exchange::{submit_request, transition_request};
use harmonic_core::{Config, Database, RequestStatus};

use super::{parse_time, print_json};

#[derive(Subcommand)]
pub enum RequestAction {
    /// Submit a new request, subject to the requester's quota
    Create {
        /// Profile asking for the gift
        requester: String,
        /// Profile that owns the offer
        giver: String,
        /// Creation time instead of now (RFC 3339)
        #[arg(long, value_parser = parse_time)]
        at: Option<DateTime<Utc>>,
    },
    /// Move a request to a new status (accepted, fulfilled, declined, cancelled)
    Status {
        /// Request ID
        id: String,
        /// New status
        status: RequestStatus,
    },
    /// List requests made by a user
    List {
        /// Profile ID
        user: String,
    },
}

pub fn run(action: RequestAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut db = Database::open()?;

    match action {
        RequestAction::Create {
            requester,
            giver,
            at,
        } => {
            let now = at.unwrap_or_else(Utc::now);
            let submission =
                submit_request(&mut db, &config.quota_policy(), &requester, &giver, now)?;
            print_json(&submission)?;
        }
        RequestAction::Status { id, status } => {
            let transition =
                transition_request(&db, &id, status, Utc::now(), config.badges.record_awards)?;
            print_json(&transition)?;
        }
        RequestAction::List { user } => {
            let requests = db.list_requests(&user)?;
            print_json(&requests)?;
        }
    }
    Ok(())
}
