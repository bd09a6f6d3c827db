//! Reading repository: append-only glucose observations.
//!
//! Queries return newest first, ties broken by insertion order.

use aida_core::{Moment, Reading, Symptoms};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::row_types::{ReadingRow, format_ts};

const SELECT_COLUMNS: &str =
    "SELECT id, user_id, glucose, moment, symptoms, created_at FROM readings";

/// Reading repository.
pub struct ReadingRepo;

impl ReadingRepo {
    /// Insert a reading. The user state row must already exist.
    pub fn create(
        conn: &Connection,
        user_id: &str,
        glucose: u16,
        moment: Moment,
        symptoms: &Symptoms,
    ) -> Result<Reading> {
        let created_at = Utc::now();
        let _ = conn.execute(
            "INSERT INTO readings (user_id, glucose, moment, symptoms, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id,
                glucose,
                moment.as_label(),
                symptoms.to_tags(),
                format_ts(created_at)
            ],
        )?;
        Ok(Reading {
            id: conn.last_insert_rowid(),
            user_id: user_id.to_string(),
            glucose,
            moment,
            symptoms: *symptoms,
            created_at,
        })
    }

    /// Most recent reading for a user.
    pub fn find_last(conn: &Connection, user_id: &str) -> Result<Option<Reading>> {
        let row = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT 1"),
                params![user_id],
                Self::map_row,
            )
            .optional()?;
        row.map(Reading::try_from).transpose()
    }

    /// Up to `limit` most recent readings for a user, newest first.
    pub fn find_recent(conn: &Connection, user_id: &str, limit: usize) -> Result<Vec<Reading>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2"
        ))?;
        let rows = stmt
            .query_map(params![user_id, limit], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(Reading::try_from).collect()
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReadingRow> {
        Ok(ReadingRow {
            id: row.get(0)?,
            user_id: row.get(1)?,
            glucose: row.get(2)?,
            moment: row.get(3)?,
            symptoms: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use crate::repositories::UserStateRepo;
    use aida_core::Symptom;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        let _ = run_migrations(&conn).unwrap();
        let _ = UserStateRepo::get_or_create(&conn, "dev-1").unwrap();
        let _ = UserStateRepo::get_or_create(&conn, "dev-2").unwrap();
        conn
    }

    #[test]
    fn store_then_fetch_last() {
        let conn = setup();
        let _ = ReadingRepo::create(&conn, "dev-1", 118, Moment::Fasting, &Symptoms::NONE).unwrap();
        let last = ReadingRepo::find_last(&conn, "dev-1").unwrap().unwrap();
        assert_eq!(last.glucose, 118);
        assert_eq!(last.moment, Moment::Fasting);
        assert!(last.symptoms.is_empty());
    }

    #[test]
    fn empty_symptoms_are_stored_as_null() {
        let conn = setup();
        let _ = ReadingRepo::create(&conn, "dev-1", 118, Moment::Fasting, &Symptoms::NONE).unwrap();
        let raw: Option<String> = conn
            .query_row("SELECT symptoms FROM readings", [], |r| r.get(0))
            .unwrap();
        assert!(raw.is_none());
    }

    #[test]
    fn symptoms_round_trip() {
        let conn = setup();
        let mut s = Symptoms::default();
        s.insert(Symptom::LowSymptoms);
        s.insert(Symptom::Vomiting);
        let _ = ReadingRepo::create(&conn, "dev-1", 250, Moment::Unknown, &s).unwrap();
        let last = ReadingRepo::find_last(&conn, "dev-1").unwrap().unwrap();
        assert_eq!(last.symptoms, s);
    }

    #[test]
    fn recent_is_newest_first_and_limited() {
        let conn = setup();
        for g in [100, 110, 120, 130] {
            let _ = ReadingRepo::create(&conn, "dev-1", g, Moment::Unknown, &Symptoms::NONE).unwrap();
        }
        let recent = ReadingRepo::find_recent(&conn, "dev-1", 3).unwrap();
        let values: Vec<u16> = recent.iter().map(|r| r.glucose).collect();
        assert_eq!(values, vec![130, 120, 110]);
    }

    #[test]
    fn readings_are_scoped_per_user() {
        let conn = setup();
        let _ = ReadingRepo::create(&conn, "dev-1", 100, Moment::Night, &Symptoms::NONE).unwrap();
        assert!(ReadingRepo::find_last(&conn, "dev-2").unwrap().is_none());
        assert!(ReadingRepo::find_recent(&conn, "dev-2", 6).unwrap().is_empty());
    }

    #[test]
    fn duplicate_submissions_are_kept() {
        let conn = setup();
        for _ in 0..2 {
            let _ = ReadingRepo::create(&conn, "dev-1", 140, Moment::PostMeal, &Symptoms::NONE).unwrap();
        }
        assert_eq!(ReadingRepo::find_recent(&conn, "dev-1", 10).unwrap().len(), 2);
    }

    #[test]
    fn unknown_user_violates_foreign_key() {
        let conn = setup();
        assert!(ReadingRepo::create(&conn, "ghost", 100, Moment::Night, &Symptoms::NONE).is_err());
    }
}
