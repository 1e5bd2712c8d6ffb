//! # Harmonic Exchange Core Library
//!
//! Business rules for the Harmonic Exchange gift-economy marketplace that
//! are worth keeping out of page handlers: how many requests a member may
//! make in a rolling window, and which badge tiers their giving, receiving
//! and participation have earned.
//!
//! ## Architecture
//!
//! - **Quota**: rolling-window request counting over any [`RequestLog`]
//! - **Badges**: pure threshold evaluation, streak derivation, award events
//! - **Requests**: the request status lifecycle
//! - **Storage**: SQLite row store and TOML configuration
//! - **Exchange**: submit / transition / profile flows over the store
//!
//! ## Key Components
//!
//! - [`QuotaTracker`]: quota computation and enforcement
//! - [`evaluate_tier`] / [`describe_requirement`]: badge tiers
//! - [`Database`]: request and award persistence
//! - [`Config`]: application configuration management

pub mod badges;
pub mod error;
pub mod exchange;
pub mod quota;
pub mod requests;
pub mod storage;

pub use badges::{
    describe_requirement, evaluate_tier, BadgeAward, BadgeProgress, BadgeSummary, BadgeTier,
    BadgeTrack,
};
pub use error::{ConfigError, CoreError, DatabaseError, LookupError, ValidationError};
pub use quota::{BulkQuotaEntry, QuotaPolicy, QuotaSnapshot, QuotaTracker, RequestLog};
pub use requests::{RequestRecord, RequestStatus};
pub use storage::{Config, Database};
