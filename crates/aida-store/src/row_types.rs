//! Raw column values and their conversion to domain types.

use aida_core::{Baseline, Reading, Symptoms, UserState};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::errors::{Result, StoreError};

/// Format a timestamp for storage. Fixed width, so text order is time order.
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidRow(format!("bad timestamp {raw:?}: {e}")))
}

/// A `readings` row.
#[derive(Debug)]
pub(crate) struct ReadingRow {
    pub id: i64,
    pub user_id: String,
    pub glucose: u16,
    pub moment: String,
    pub symptoms: Option<String>,
    pub created_at: String,
}

impl TryFrom<ReadingRow> for Reading {
    type Error = StoreError;

    fn try_from(row: ReadingRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            moment: row.moment.parse().map_err(StoreError::InvalidRow)?,
            symptoms: row
                .symptoms
                .as_deref()
                .map_or(Symptoms::NONE, Symptoms::from_tags),
            created_at: parse_ts(&row.created_at)?,
            user_id: row.user_id,
            glucose: row.glucose,
        })
    }
}

/// A `user_state` row.
#[derive(Debug)]
pub(crate) struct UserStateRow {
    pub id: String,
    pub baseline_a1c: Option<f64>,
    pub baseline_avg_glucose: Option<u16>,
    pub baseline_set_at: Option<String>,
    pub created_at: String,
}

impl TryFrom<UserStateRow> for UserState {
    type Error = StoreError;

    fn try_from(row: UserStateRow) -> Result<Self> {
        let set_at = row.baseline_set_at.as_deref().map(parse_ts).transpose()?;
        Ok(Self {
            created_at: parse_ts(&row.created_at)?,
            id: row.id,
            baseline: Baseline {
                a1c: row.baseline_a1c,
                avg_glucose: row.baseline_avg_glucose,
                set_at,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aida_core::Moment;

    #[test]
    fn timestamps_sort_lexicographically() {
        let a = format_ts(DateTime::parse_from_rfc3339("2026-01-01T09:00:00Z").unwrap().into());
        let b = format_ts(DateTime::parse_from_rfc3339("2026-01-01T10:00:00.5Z").unwrap().into());
        assert!(a < b);
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn reading_row_converts() {
        let row = ReadingRow {
            id: 3,
            user_id: "dev-1".into(),
            glucose: 140,
            moment: "POSTCOMIDA".into(),
            symptoms: Some("vomiting".into()),
            created_at: "2026-01-01T09:00:00.000000Z".into(),
        };
        let r = Reading::try_from(row).unwrap();
        assert_eq!(r.moment, Moment::PostMeal);
        assert!(r.symptoms.vomiting);
    }

    #[test]
    fn unknown_moment_is_invalid_row() {
        let row = ReadingRow {
            id: 1,
            user_id: "dev-1".into(),
            glucose: 140,
            moment: "LUNCH".into(),
            symptoms: None,
            created_at: "2026-01-01T09:00:00.000000Z".into(),
        };
        assert!(matches!(Reading::try_from(row), Err(StoreError::InvalidRow(_))));
    }
}
