//! Quota policy: window length and request limit.
//!
//! The limit can be overridden through `HX_REQUEST_QUOTA_LIMIT`. Anything
//! other than a positive integer falls back to the configured default.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_REQUEST_LIMIT: u32 = 3;
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Longest accepted window, roughly a century.
pub const MAX_WINDOW_DAYS: u32 = 36_500;

/// Environment variable overriding the request limit.
pub const QUOTA_LIMIT_ENV: &str = "HX_REQUEST_QUOTA_LIMIT";

/// Parameters of the rolling request quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaPolicy {
    /// Length of the trailing window in days
    pub window_days: u32,
    /// Maximum qualifying requests inside the window
    pub limit: u32,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            limit: DEFAULT_REQUEST_LIMIT,
        }
    }
}

impl QuotaPolicy {
    /// Default window with the limit taken from `HX_REQUEST_QUOTA_LIMIT`.
    pub fn from_env() -> Self {
        Self::default().with_limit_override(std::env::var(QUOTA_LIMIT_ENV).ok().as_deref())
    }

    /// Apply a raw limit override. Invalid or absent values keep the
    /// current limit.
    pub fn with_limit_override(mut self, raw: Option<&str>) -> Self {
        self.limit = parse_limit_or(raw, self.limit);
        self
    }

    /// Earliest `created_at` that still falls inside the window.
    ///
    /// # Errors
    /// Returns [`ValidationError::WindowOutOfRange`] for a zero or oversized
    /// window, or one reaching before the earliest representable instant.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ValidationError> {
        let out_of_range = || ValidationError::WindowOutOfRange {
            days: self.window_days,
            max: MAX_WINDOW_DAYS,
        };
        if !is_valid_window(self.window_days) {
            return Err(out_of_range());
        }
        now.checked_sub_signed(Duration::days(i64::from(self.window_days)))
            .ok_or_else(out_of_range)
    }

    /// Label used in quota snapshots, e.g. `last_30_days`.
    pub fn window_label(&self) -> String {
        format!("last_{}_days", self.window_days)
    }
}

/// Whether `days` is a usable window length (`1..=MAX_WINDOW_DAYS`).
pub fn is_valid_window(days: u32) -> bool {
    (1..=MAX_WINDOW_DAYS).contains(&days)
}

/// Parse an environment-style limit, falling back to [`DEFAULT_REQUEST_LIMIT`].
pub fn parse_limit(raw: Option<&str>) -> u32 {
    parse_limit_or(raw, DEFAULT_REQUEST_LIMIT)
}

/// Parse an environment-style limit, falling back to `fallback` when the
/// value is absent, not an integer, or not positive.
pub fn parse_limit_or(raw: Option<&str>, fallback: u32) -> u32 {
    let Some(raw) = raw else {
        return fallback;
    };
    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => u32::try_from(n).unwrap_or(u32::MAX),
        _ => {
            tracing::warn!(value = raw, fallback, "ignoring invalid {QUOTA_LIMIT_ENV}");
            fallback
        }
    }
}
