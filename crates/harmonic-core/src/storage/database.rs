//! SQLite-backed request and badge storage.
//!
//! Provides persistent storage for:
//! - Exchange requests and their status history
//! - Badge award events
//!
//! Timestamps are stored as fixed-width RFC 3339 strings in UTC
//! (`2026-05-20T09:30:00.000000000Z`), so string comparison matches time order.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration as StdDuration;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, TransactionBehavior};

use super::data_dir;
use crate::badges::{BadgeAward, BadgeTrack};
use crate::error::{CoreError, DatabaseError, LookupError, Result, ValidationError};
use crate::quota::{check_remaining, saturate, QuotaPolicy, QuotaSnapshot, RequestLog};
use crate::requests::{require_id, RequestRecord, RequestStatus, QUALIFYING_STATUSES};

/// Requester ids per grouped count query, well under SQLite's variable limit.
const BULK_CHUNK: usize = 500;

/// SQLite database for requests and badge awards.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/harmonic.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("harmonic.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) a database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(StdDuration::from_secs(5))?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS requests (
                    id          TEXT PRIMARY KEY,
                    requester   TEXT NOT NULL,
                    giver       TEXT NOT NULL,
                    status      TEXT NOT NULL,
                    created_at  TEXT NOT NULL,
                    updated_at  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS badge_awards (
                    profile_id  TEXT NOT NULL,
                    track       TEXT NOT NULL,
                    tier        INTEGER NOT NULL,
                    earned_at   TEXT NOT NULL,
                    PRIMARY KEY (profile_id, track, tier)
                );

                -- Quota counts filter on requester and window start
                CREATE INDEX IF NOT EXISTS idx_requests_requester_created_at ON requests(requester, created_at);
                CREATE INDEX IF NOT EXISTS idx_requests_giver_status ON requests(giver, status);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Store a request row as-is, without any quota check.
    ///
    /// # Errors
    /// Returns an error for empty ids or if the insert fails.
    pub fn insert_request(
        &self,
        requester: &str,
        giver: &str,
        status: RequestStatus,
        created_at: DateTime<Utc>,
    ) -> Result<RequestRecord> {
        validate_parties(requester, giver)?;
        let record = RequestRecord {
            status,
            ..RequestRecord::new_pending(requester, giver, created_at)
        };
        insert_record(&self.conn, &record)?;
        Ok(record)
    }

    /// Count qualifying requests and insert a new pending one in a single
    /// `IMMEDIATE` transaction.
    ///
    /// The write lock is taken before counting, so concurrent submissions
    /// for the same requester are serialized. Returns the stored record and
    /// the quota snapshot after the insert.
    ///
    /// # Errors
    /// Returns [`CoreError::QuotaExceeded`] when the requester has no
    /// requests left, [`CoreError::Lookup`] if the count fails, and
    /// database or validation errors otherwise.
    pub fn insert_request_within_quota(
        &mut self,
        requester: &str,
        giver: &str,
        policy: &QuotaPolicy,
        now: DateTime<Utc>,
    ) -> Result<(RequestRecord, QuotaSnapshot)> {
        validate_parties(requester, giver)?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let used = count_qualifying(&tx, requester, policy.cutoff(now)?)?;
        let before = check_remaining(QuotaSnapshot::new(saturate(used), policy), policy)?;

        let record = RequestRecord::new_pending(requester, giver, now);
        insert_record(&tx, &record)?;
        tx.commit()?;

        tracing::info!(
            id = %record.id,
            requester,
            giver,
            used = before.used + 1,
            limit = before.limit,
            "recorded request"
        );
        Ok((record, QuotaSnapshot::new(before.used.saturating_add(1), policy)))
    }

    /// Fetch one request by id.
    pub fn get_request(&self, id: &str) -> Result<Option<RequestRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, requester, giver, status, created_at, updated_at
             FROM requests WHERE id = ?1",
        )?;
        let result = stmt.query_row(params![id], row_to_record);
        match result {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Requests made by `requester`, newest first.
    pub fn list_requests(&self, requester: &str) -> Result<Vec<RequestRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, requester, giver, status, created_at, updated_at
             FROM requests WHERE requester = ?1
             ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![requester], row_to_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Move a request to `next`, enforcing the request lifecycle.
    ///
    /// Returns the status the request had before and the updated record.
    ///
    /// # Errors
    /// Returns [`DatabaseError::RequestNotFound`] for unknown ids and
    /// [`ValidationError::InvalidTransition`] for disallowed moves.
    pub fn update_status(
        &self,
        id: &str,
        next: RequestStatus,
        now: DateTime<Utc>,
    ) -> Result<(RequestStatus, RequestRecord)> {
        require_id(id, "request_id")?;
        let mut record = self
            .get_request(id)?
            .ok_or_else(|| DatabaseError::RequestNotFound(id.to_string()))?;

        let previous = record.status;
        record.status = previous.transition(next)?;
        record.updated_at = now;

        self.conn.execute(
            "UPDATE requests SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![record.status.as_str(), ts(now), id],
        )?;
        tracing::info!(id, from = %previous, to = %next, "request status changed");
        Ok((previous, record))
    }

    /// Lifetime `(gifts_given, gifts_received)` for a profile, counting only
    /// fulfilled requests.
    pub fn gift_counts(&self, profile_id: &str) -> Result<(i64, i64), DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(SUM(giver = ?1), 0), COALESCE(SUM(requester = ?1), 0)
             FROM requests
             WHERE status = 'fulfilled' AND (giver = ?1 OR requester = ?1)",
        )?;
        let counts = stmt.query_row(params![profile_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;
        Ok(counts)
    }

    /// Distinct UTC dates on which the profile created or moved a request,
    /// as requester or giver.
    pub fn activity_dates(&self, profile_id: &str) -> Result<Vec<NaiveDate>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT substr(created_at, 1, 10) FROM requests WHERE requester = ?1 OR giver = ?1
             UNION
             SELECT substr(updated_at, 1, 10) FROM requests WHERE requester = ?1 OR giver = ?1
             ORDER BY 1",
        )?;
        let rows = stmt.query_map(params![profile_id], |row| {
            let raw: String = row.get(0)?;
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
        })?;
        let mut dates = Vec::new();
        for row in rows {
            dates.push(row?);
        }
        Ok(dates)
    }

    /// Persist an award unless the profile already holds that tier.
    ///
    /// Returns `true` if the award was new. An existing award keeps its
    /// original `earned_at`.
    pub fn record_award(&self, award: &BadgeAward) -> Result<bool, DatabaseError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO badge_awards (profile_id, track, tier, earned_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                award.profile_id,
                award.track.as_str(),
                award.tier,
                ts(award.earned_at),
            ],
        )?;
        if inserted == 1 {
            tracing::info!(
                profile_id = %award.profile_id,
                track = %award.track,
                tier = award.tier,
                "badge awarded"
            );
        }
        Ok(inserted == 1)
    }

    /// Awards held by a profile, oldest first.
    pub fn awards(&self, profile_id: &str) -> Result<Vec<BadgeAward>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT profile_id, track, tier, earned_at
             FROM badge_awards WHERE profile_id = ?1
             ORDER BY earned_at, track, tier",
        )?;
        let rows = stmt.query_map(params![profile_id], |row| {
            let track: String = row.get(1)?;
            let track = track.parse::<BadgeTrack>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e))
            })?;
            Ok(BadgeAward {
                profile_id: row.get(0)?,
                track,
                tier: row.get(2)?,
                earned_at: parse_ts(&row.get::<_, String>(3)?, 3)?,
            })
        })?;
        let mut awards = Vec::new();
        for row in rows {
            awards.push(row?);
        }
        Ok(awards)
    }
}

impl RequestLog for Database {
    fn count_requests_since(
        &self,
        requester: &str,
        statuses: &[RequestStatus],
        cutoff: DateTime<Utc>,
    ) -> Result<u64, LookupError> {
        let sql = format!(
            "SELECT COUNT(*) FROM requests
             WHERE requester = ? AND created_at >= ? AND status IN ({})",
            placeholders(statuses.len())
        );
        let mut values = vec![requester.to_string(), ts(cutoff)];
        values.extend(statuses.iter().map(|s| s.as_str().to_string()));

        let count = self
            .conn
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get::<_, i64>(0))?;
        Ok(count.max(0) as u64)
    }

    fn count_requests_by_requester(
        &self,
        requesters: &[String],
        statuses: &[RequestStatus],
        cutoff: DateTime<Utc>,
    ) -> Result<HashMap<String, u64>, LookupError> {
        let mut counts = HashMap::new();
        for chunk in requesters.chunks(BULK_CHUNK) {
            let sql = format!(
                "SELECT requester, COUNT(*) FROM requests
                 WHERE created_at >= ? AND status IN ({}) AND requester IN ({})
                 GROUP BY requester",
                placeholders(statuses.len()),
                placeholders(chunk.len())
            );
            let mut values = vec![ts(cutoff)];
            values.extend(statuses.iter().map(|s| s.as_str().to_string()));
            values.extend(chunk.iter().cloned());

            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (requester, count) = row?;
                counts.insert(requester, count.max(0) as u64);
            }
        }
        Ok(counts)
    }
}

fn validate_parties(requester: &str, giver: &str) -> Result<(), ValidationError> {
    require_id(requester, "requester")?;
    require_id(giver, "giver")?;
    if requester == giver {
        return Err(ValidationError::SelfRequest(requester.to_string()));
    }
    Ok(())
}

fn count_qualifying(conn: &Connection, requester: &str, cutoff: DateTime<Utc>) -> Result<u64, CoreError> {
    let sql = format!(
        "SELECT COUNT(*) FROM requests
         WHERE requester = ? AND created_at >= ? AND status IN ({})",
        placeholders(QUALIFYING_STATUSES.len())
    );
    let mut values = vec![requester.to_string(), ts(cutoff)];
    values.extend(QUALIFYING_STATUSES.iter().map(|s| s.as_str().to_string()));

    let count = conn
        .query_row(&sql, params_from_iter(values.iter()), |row| row.get::<_, i64>(0))
        .map_err(LookupError::from)?;
    Ok(count.max(0) as u64)
}

fn insert_record(conn: &Connection, record: &RequestRecord) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO requests (id, requester, giver, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.id,
            record.requester,
            record.giver,
            record.status.as_str(),
            ts(record.created_at),
            ts(record.updated_at),
        ],
    )?;
    Ok(())
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RequestRecord> {
    let status: String = row.get(3)?;
    let status = status
        .parse::<RequestStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    Ok(RequestRecord {
        id: row.get(0)?,
        requester: row.get(1)?,
        giver: row.get(2)?,
        status,
        created_at: parse_ts(&row.get::<_, String>(4)?, 4)?,
        updated_at: parse_ts(&row.get::<_, String>(5)?, 5)?,
    })
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(raw: &str, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
