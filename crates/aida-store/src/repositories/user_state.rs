//! User state repository: the per-user row holding the baseline.

use aida_core::UserState;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::row_types::{UserStateRow, format_ts};

const SELECT_COLUMNS: &str =
    "SELECT id, baseline_a1c, baseline_avg_glucose, baseline_set_at, created_at FROM user_state";

/// User state repository.
pub struct UserStateRepo;

impl UserStateRepo {
    /// Fetch a user's state.
    pub fn get(conn: &Connection, user_id: &str) -> Result<Option<UserState>> {
        let row = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![user_id],
                Self::map_row,
            )
            .optional()?;
        row.map(UserState::try_from).transpose()
    }

    /// Fetch a user's state, creating an empty row first if needed.
    pub fn get_or_create(conn: &Connection, user_id: &str) -> Result<UserState> {
        let created = conn.execute(
            "INSERT OR IGNORE INTO user_state (id, created_at) VALUES (?1, ?2)",
            params![user_id, format_ts(Utc::now())],
        )?;
        if created > 0 {
            tracing::debug!(user_id, "user state created");
        }
        let row = conn.query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            params![user_id],
            Self::map_row,
        )?;
        UserState::try_from(row)
    }

    /// Write baseline values. Absent values keep what is stored; `set_at` is always refreshed.
    pub fn upsert_baseline(
        conn: &Connection,
        user_id: &str,
        a1c: Option<f64>,
        avg_glucose: Option<u16>,
    ) -> Result<UserState> {
        let now = format_ts(Utc::now());
        let _ = conn.execute(
            "INSERT INTO user_state (id, baseline_a1c, baseline_avg_glucose, baseline_set_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(id) DO UPDATE SET
                 baseline_a1c = COALESCE(excluded.baseline_a1c, user_state.baseline_a1c),
                 baseline_avg_glucose = COALESCE(excluded.baseline_avg_glucose, user_state.baseline_avg_glucose),
                 baseline_set_at = excluded.baseline_set_at",
            params![user_id, a1c, avg_glucose, now],
        )?;
        Self::get_or_create(conn, user_id)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserStateRow> {
        Ok(UserStateRow {
            id: row.get(0)?,
            baseline_a1c: row.get(1)?,
            baseline_avg_glucose: row.get(2)?,
            baseline_set_at: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}
