//! Async persistence contract used by the turn orchestrator.

use aida_core::{Moment, Reading, Symptoms, UserState};
use async_trait::async_trait;

use crate::connection::ConnectionPool;
use crate::errors::{Result, StoreError};
use crate::repositories::{ReadingRepo, UserStateRepo};

/// Persistence for readings and per-user baselines, keyed by an opaque user id.
#[async_trait]
pub trait CoachStore: Send + Sync {
    /// Append a reading. Creates the user state if it does not exist yet.
    async fn create_reading(
        &self,
        user_id: &str,
        glucose: u16,
        moment: Moment,
        symptoms: Symptoms,
    ) -> Result<Reading>;

    /// Most recent reading.
    async fn find_last_reading(&self, user_id: &str) -> Result<Option<Reading>>;

    /// Up to `limit` most recent readings, newest first.
    async fn find_recent_readings(&self, user_id: &str, limit: usize) -> Result<Vec<Reading>>;

    /// Fetch the user's state, creating it if needed.
    async fn get_or_create_user_state(&self, user_id: &str) -> Result<UserState>;

    /// Write whichever baseline values are present.
    async fn upsert_baseline(
        &self,
        user_id: &str,
        a1c: Option<f64>,
        avg_glucose: Option<u16>,
    ) -> Result<UserState>;
}

/// [`CoachStore`] backed by an r2d2 `SQLite` pool.
///
/// Each call checks out a connection on tokio's blocking pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: ConnectionPool,
}

impl SqliteStore {
    /// Wrap a pool. Migrations must already have run.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Open an in-memory database with migrations applied.
    pub fn open_in_memory() -> Result<Self> {
        let pool = crate::connection::new_in_memory(&crate::ConnectionConfig::default())?;
        let _ = crate::migrations::run_migrations(&*pool.get()?)?;
        Ok(Self::new(pool))
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }
}

#[async_trait]
impl CoachStore for SqliteStore {
    async fn create_reading(
        &self,
        user_id: &str,
        glucose: u16,
        moment: Moment,
        symptoms: Symptoms,
    ) -> Result<Reading> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let _ = UserStateRepo::get_or_create(conn, &user_id)?;
            ReadingRepo::create(conn, &user_id, glucose, moment, &symptoms)
        })
        .await
    }

    async fn find_last_reading(&self, user_id: &str) -> Result<Option<Reading>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| ReadingRepo::find_last(conn, &user_id))
            .await
    }

    async fn find_recent_readings(&self, user_id: &str, limit: usize) -> Result<Vec<Reading>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| ReadingRepo::find_recent(conn, &user_id, limit))
            .await
    }

    async fn get_or_create_user_state(&self, user_id: &str) -> Result<UserState> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| UserStateRepo::get_or_create(conn, &user_id))
            .await
    }

    async fn upsert_baseline(
        &self,
        user_id: &str,
        a1c: Option<f64>,
        avg_glucose: Option<u16>,
    ) -> Result<UserState> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| UserStateRepo::upsert_baseline(conn, &user_id, a1c, avg_glucose))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trip_through_trait() {
        let store = SqliteStore::open_in_memory().unwrap();
        let saved = store
            .create_reading("dev-1", 118, Moment::Fasting, Symptoms::NONE)
            .await
            .unwrap();
        let last = store.find_last_reading("dev-1").await.unwrap().unwrap();
        assert_eq!(last.id, saved.id);
        assert_eq!(last.glucose, 118);
        assert_eq!(last.moment, Moment::Fasting);
        assert!(last.symptoms.is_empty());
    }

    #[tokio::test]
    async fn create_reading_creates_user_state() {
        let store = SqliteStore::open_in_memory().unwrap();
        let _ = store
            .create_reading("fresh", 140, Moment::Night, Symptoms::NONE)
            .await
            .unwrap();
        let state = store.get_or_create_user_state("fresh").await.unwrap();
        assert_eq!(state.id, "fresh");
    }

    #[tokio::test]
    async fn baseline_through_trait() {
        let store = SqliteStore::open_in_memory().unwrap();
        let state = store.upsert_baseline("dev-1", Some(8.5), Some(190)).await.unwrap();
        assert!(state.baseline.is_set());
        let again = store.get_or_create_user_state("dev-1").await.unwrap();
        assert_eq!(again.baseline.avg_glucose, Some(190));
    }

    #[tokio::test]
    async fn file_store_persists_across_pools() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aida.db");
        let path = path.to_str().unwrap();
        {
            let pool = crate::new_file(path, &crate::ConnectionConfig::default()).unwrap();
            let _ = crate::run_migrations(&*pool.get().unwrap()).unwrap();
            let store = SqliteStore::new(pool);
            let _ = store
                .create_reading("dev-1", 130, Moment::Fasting, Symptoms::NONE)
                .await
                .unwrap();
        }
        let pool = crate::new_file(path, &crate::ConnectionConfig::default()).unwrap();
        let store = SqliteStore::new(pool);
        let recent = store.find_recent_readings("dev-1", 6).await.unwrap();
        assert_eq!(recent.len(), 1);
    }
}
