//! # aida-store
//!
//! `SQLite` persistence behind the [`CoachStore`] trait.
//!
//! - [`connection`]: r2d2 pool with per-connection pragmas
//! - [`migrations`]: embedded, versioned schema migrations
//! - [`repositories`]: stateless repos taking `&Connection`
//! - [`SqliteStore`]: async adapter running repo calls on the blocking pool

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod migrations;
pub mod repositories;
mod row_types;
pub mod store;

pub use connection::{ConnectionConfig, ConnectionPool, new_file, new_in_memory};
pub use errors::{Result, StoreError};
pub use migrations::run_migrations;
pub use store::{CoachStore, SqliteStore};
