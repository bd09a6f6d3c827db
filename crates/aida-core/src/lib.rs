//! # aida-core
//!
//! Shared vocabulary for the AIDA glucose-coaching backend.
//!
//! - **Readings**: [`Reading`], [`Moment`], [`Symptoms`] for stored glucose observations
//! - **Baselines**: [`Baseline`] and [`UserState`] for per-user reference lab values
//! - **Phases**: [`Phase`] identifies the protocol stage that selects rule replies
//! - **Messages**: [`ChatMessage`] and [`Role`] plus history windowing helpers
//! - **Errors**: [`ValidationError`] for malformed turn input
//! - **Logging**: [`logging::init_subscriber`] for the global `tracing` subscriber

#![deny(unsafe_code)]

pub mod errors;
pub mod logging;
pub mod messages;
pub mod phase;
pub mod reading;

pub use errors::ValidationError;
pub use messages::{ChatMessage, Role};
pub use phase::Phase;
pub use reading::{Baseline, Moment, Reading, Symptom, Symptoms, UserState};
